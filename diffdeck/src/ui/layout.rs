//! Pane layout.
//!
//! Pure layout arithmetic, recomputed on every draw so it always reflects the
//! current terminal size. `Spacing::Overlap(1)` plus
//! `Block::merge_borders(MergeStrategy::Fuzzy)` lets adjacent panes share a
//! border column with merged junction characters.

use ratatui::{
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
    Frame,
};

use crate::app::{Mode, ViewState};
use crate::theme::Theme;

/// Below this width the file tree collapses and the two diff panes share
/// the full width.
pub const TREE_MIN_WIDTH: u16 = 100;

/// Returns `[tree, left, right, status_bar]` for a terminal of size `area`.
pub fn compute_layout(area: Rect) -> [Rect; 4] {
    let [main_area, status_bar] = area.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let tree_width = if area.width >= TREE_MIN_WIDTH {
        Constraint::Percentage(25)
    } else {
        Constraint::Length(0)
    };
    let [tree, diff] =
        main_area.layout(&Layout::horizontal([tree_width, Constraint::Fill(1)]).spacing(Spacing::Overlap(1)));
    let [left, right] = diff.layout(
        &Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).spacing(Spacing::Overlap(1)),
    );

    [tree, left, right, status_bar]
}

/// A pane's inner area after its 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered block for a pane: thick border when focused, plain otherwise.
/// `Fuzzy` merging because `Exact` draws wrong junctions between thick and
/// plain borders.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// What the status bar reports about the session.
#[derive(Debug, Default)]
pub struct StatusInfo {
    /// e.g. `git unstaged`.
    pub source: String,
    /// 1-based position of the current file in display order, and the count.
    pub file: Option<(usize, usize)>,
    /// 1-based hunk containing the cursor, and the count.
    pub hunk: Option<(usize, usize)>,
    /// Notice from the controller or a transient message.
    pub message: Option<String>,
}

/// Renders the one-row status bar: mode, source, position, message.
pub fn render_status_bar(frame: &mut Frame, area: Rect, info: &StatusInfo, view: &ViewState, theme: &Theme) {
    let mode_text = match view.mode {
        Mode::Normal => " NORMAL ",
        Mode::Help => " HELP ",
    };
    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(theme.status_mode).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", info.source)),
    ];
    if let Some((pos, count)) = info.file {
        spans.push(Span::raw(format!(" file {pos}/{count} ")));
    }
    if let Some((pos, count)) = info.hunk {
        spans.push(Span::raw(format!(" hunk {pos}/{count} ")));
    }
    if let Some(message) = &info.message {
        spans.push(Span::styled(format!(" {message}"), Style::default().fg(theme.status_notice)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
