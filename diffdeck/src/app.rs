//! View state of the terminal UI.
//!
//! Session data (files, selection, cursor) belongs to the controller and the
//! host. This module only holds what the terminal needs on top of that:
//! mode, focus, scroll offsets, cached viewport sizes and the transient
//! status line.

use ratatui::layout::Rect;

use diffdeck_core::model::{Location, Side};

/// Ticks a status message stays visible (250 ms each).
const STATUS_TICKS: u8 = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Help overlay is shown above all panels.
    Help,
}

/// Which pane receives navigation keys. Cycles FileTree → Left → Right.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    FileTree,
    Left,
    #[default]
    Right,
}

impl PanelFocus {
    pub fn next(self) -> Self {
        match self {
            PanelFocus::FileTree => PanelFocus::Left,
            PanelFocus::Left => PanelFocus::Right,
            PanelFocus::Right => PanelFocus::FileTree,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            PanelFocus::FileTree => PanelFocus::Right,
            PanelFocus::Left => PanelFocus::FileTree,
            PanelFocus::Right => PanelFocus::Left,
        }
    }

    /// The diff side this pane shows, if it is a diff pane.
    pub fn side(self) -> Option<Side> {
        match self {
            PanelFocus::FileTree => None,
            PanelFocus::Left => Some(Side::Left),
            PanelFocus::Right => Some(Side::Right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    ticks_left: u8,
}

pub struct ViewState {
    pub mode: Mode,
    pub focus: PanelFocus,

    /// First aligned row shown in the diff panes. Both panes scroll together.
    pub diff_scroll: usize,
    /// Inner height of the diff panes, cached on every render.
    pub diff_viewport_height: u16,
    pub tree_viewport_height: u16,
    pub help_scroll: u16,

    /// Outer rects of [tree, left, right] from the last render, for mouse focus.
    pub panel_rects: [Rect; 3],

    pub status: Option<StatusMessage>,
    /// Most recent goto-line result, printed on exit.
    pub last_goto: Option<Location>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            diff_scroll: 0,
            diff_viewport_height: 0,
            tree_viewport_height: 0,
            help_scroll: 0,
            panel_rects: [Rect::default(); 3],
            status: None,
            last_goto: None,
        }
    }
}

impl ViewState {
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), ticks_left: STATUS_TICKS });
    }

    /// Ages the status message; it disappears after a few seconds.
    pub fn on_tick(&mut self) {
        if let Some(status) = &mut self.status {
            status.ticks_left = status.ticks_left.saturating_sub(1);
            if status.ticks_left == 0 {
                self.status = None;
            }
        }
    }

    /// Half the diff viewport, at least one row.
    pub fn half_page(&self) -> usize {
        usize::from(self.diff_viewport_height / 2).max(1)
    }

    /// Scrolls the diff panes so `cursor` is inside the viewport. Jumps that
    /// land off-screen put the cursor a third of the way down.
    pub fn keep_cursor_visible(&mut self, cursor: usize) {
        let height = usize::from(self.diff_viewport_height).max(1);
        if cursor >= self.diff_scroll && cursor < self.diff_scroll + height {
            return;
        }
        if cursor + 1 == self.diff_scroll || cursor == self.diff_scroll + height {
            // One-row steps scroll by one row.
            self.diff_scroll = if cursor < self.diff_scroll { cursor } else { cursor + 1 - height };
            return;
        }
        self.diff_scroll = cursor.saturating_sub(height / 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(height: u16) -> ViewState {
        ViewState { diff_viewport_height: height, ..ViewState::default() }
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut focus = PanelFocus::FileTree;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, PanelFocus::FileTree);
        assert_eq!(PanelFocus::FileTree.prev(), PanelFocus::Right);
        assert_eq!(PanelFocus::Left.side(), Some(Side::Left));
        assert_eq!(PanelFocus::FileTree.side(), None);
    }

    #[test]
    fn cursor_inside_viewport_does_not_scroll() {
        let mut v = view(10);
        v.diff_scroll = 5;
        v.keep_cursor_visible(14);
        assert_eq!(v.diff_scroll, 5);
    }

    #[test]
    fn single_steps_scroll_by_one_row() {
        let mut v = view(10);
        v.keep_cursor_visible(10);
        assert_eq!(v.diff_scroll, 1);
        v.diff_scroll = 5;
        v.keep_cursor_visible(4);
        assert_eq!(v.diff_scroll, 4);
    }

    #[test]
    fn far_jumps_place_cursor_in_upper_third() {
        let mut v = view(9);
        v.keep_cursor_visible(100);
        assert_eq!(v.diff_scroll, 97);
        v.keep_cursor_visible(1);
        assert_eq!(v.diff_scroll, 0);
    }

    #[test]
    fn status_expires_after_its_ticks() {
        let mut v = view(10);
        v.set_status("refreshing");
        for _ in 0..STATUS_TICKS - 1 {
            v.on_tick();
        }
        assert!(v.status.is_some());
        v.on_tick();
        assert!(v.status.is_none());
    }
}
