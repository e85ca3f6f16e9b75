//! Key and mouse dispatch.
//!
//! Keys become `HostCommand`s for the controller where they touch the
//! session, and `ViewState` mutations where they only touch the view. The
//! dispatcher branches on `view.mode` first so the help overlay has its own
//! handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use diffdeck_core::controller::SessionController;
use diffdeck_core::host::{CommandOutcome, HostCommand};

use crate::app::{Mode, PanelFocus, ViewState};
use crate::host::TuiHost;

/// Rows moved per mouse wheel notch.
const WHEEL_STEP: isize = 3;

/// Control-flow signal for the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

type Controller = SessionController<TuiHost>;

pub fn handle_key(key: KeyEvent, controller: &mut Controller, view: &mut ViewState) -> KeyAction {
    match view.mode {
        Mode::Help => handle_help(key, view),
        Mode::Normal => handle_normal(key, controller, view),
    }
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    By(isize),
    Top,
    Bottom,
}

fn handle_normal(key: KeyEvent, controller: &mut Controller, view: &mut ViewState) -> KeyAction {
    if let Some(motion) = motion_for(key, view) {
        apply_motion(motion, controller, view);
        return KeyAction::Continue;
    }

    match key.code {
        KeyCode::Tab => view.focus = view.focus.next(),
        KeyCode::BackTab => view.focus = view.focus.prev(),

        KeyCode::Char('}') => {
            command(HostCommand::NextFile, controller, view);
        }
        KeyCode::Char('{') => {
            command(HostCommand::PrevFile, controller, view);
        }
        KeyCode::Char(']') => {
            command(HostCommand::NextHunk, controller, view);
        }
        KeyCode::Char('[') => {
            command(HostCommand::PrevHunk, controller, view);
        }

        KeyCode::Enter => enter(controller, view),

        KeyCode::Char('r') => {
            if command(HostCommand::Refresh, controller, view) == CommandOutcome::Handled {
                view.set_status("refreshing");
            }
        }
        KeyCode::Char('s') => match command(HostCommand::Saved, controller, view) {
            CommandOutcome::Handled => view.set_status("saved, refreshing"),
            _ if !controller.config().refresh_on_save => view.set_status("refresh on save is off"),
            _ => {}
        },

        KeyCode::Char('?') => {
            view.help_scroll = 0;
            view.mode = Mode::Help;
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            controller.dispatch(HostCommand::Close);
            return KeyAction::Quit;
        }
        _ => {}
    }
    KeyAction::Continue
}

fn motion_for(key: KeyEvent, view: &ViewState) -> Option<Motion> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let half = isize::try_from(view.half_page()).unwrap_or(1);
    Some(match key.code {
        KeyCode::Char('j') | KeyCode::Down => Motion::By(1),
        KeyCode::Char('k') | KeyCode::Up => Motion::By(-1),
        KeyCode::Char('d') if ctrl => Motion::By(half),
        KeyCode::Char('u') if ctrl => Motion::By(-half),
        KeyCode::PageDown => Motion::By(half * 2),
        KeyCode::PageUp => Motion::By(-half * 2),
        KeyCode::Char('g') | KeyCode::Home => Motion::Top,
        KeyCode::Char('G') | KeyCode::End => Motion::Bottom,
        _ => return None,
    })
}

/// Moves the tree cursor when the tree has focus, the diff cursor otherwise.
fn apply_motion(motion: Motion, controller: &mut Controller, view: &mut ViewState) {
    if view.focus == PanelFocus::FileTree {
        let host = controller.host_mut();
        match motion {
            Motion::By(delta) => host.move_tree_cursor(delta),
            Motion::Top => host.set_tree_cursor(0),
            Motion::Bottom => host.set_tree_cursor(usize::MAX),
        }
        return;
    }

    let host = controller.host();
    let Some(rows) = host.current_file().map(|f| f.row_count()).filter(|&n| n > 0) else {
        return;
    };
    let row = host.cursor_row().unwrap_or(0);
    let target = match motion {
        Motion::By(delta) => row.saturating_add_signed(delta).min(rows - 1),
        Motion::Top => 0,
        Motion::Bottom => rows - 1,
    };
    if target != row {
        command(HostCommand::SetRow(target), controller, view);
    }
}

/// Enter on the tree opens the file under the cursor; on a diff pane it
/// resolves the cursor row to a source location on that side.
fn enter(controller: &mut Controller, view: &mut ViewState) {
    let Some(side) = view.focus.side() else {
        if let Some(index) = controller.host().tree_selection() {
            command(HostCommand::SelectFile(index), controller, view);
            view.focus = PanelFocus::Right;
        }
        return;
    };
    let Some(row) = controller.host().cursor_row() else {
        return;
    };
    match command(HostCommand::GotoLine { side, row, col: 1 }, controller, view) {
        CommandOutcome::Goto(location) => {
            view.set_status(format!("goto {location}"));
            view.last_goto = Some(location);
        }
        _ => view.set_status("no source line on this side"),
    }
}

/// Dispatches `cmd` and brings the host's cursor and the scroll offset in
/// line with the session.
fn command(cmd: HostCommand, controller: &mut Controller, view: &mut ViewState) -> CommandOutcome {
    let outcome = controller.dispatch(cmd);
    if controller.is_open() {
        let row = controller.session().cursor_row();
        controller.host_mut().sync_cursor(row);
        view.keep_cursor_visible(row);
    }
    outcome
}

fn handle_help(key: KeyEvent, view: &mut ViewState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => view.help_scroll = view.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => view.help_scroll = view.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => view.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => view.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

/// Left click focuses the pane under the pointer; the wheel moves the
/// focused pane's cursor, or scrolls the help overlay.
pub fn handle_mouse(mouse: MouseEvent, controller: &mut Controller, view: &mut ViewState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let pos = Position { x: mouse.column, y: mouse.row };
            let [tree, left, right] = view.panel_rects;
            if tree.width > 0 && tree.contains(pos) {
                view.focus = PanelFocus::FileTree;
            } else if left.contains(pos) {
                view.focus = PanelFocus::Left;
            } else if right.contains(pos) {
                view.focus = PanelFocus::Right;
            }
        }
        MouseEventKind::ScrollUp if view.mode == Mode::Help => {
            view.help_scroll = view.help_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown if view.mode == Mode::Help => {
            view.help_scroll = view.help_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp => apply_motion(Motion::By(-WHEEL_STEP), controller, view),
        MouseEventKind::ScrollDown => apply_motion(Motion::By(WHEEL_STEP), controller, view),
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffdeck_core::config::SessionConfig;
    use diffdeck_core::error::ProviderError;
    use diffdeck_core::event::SessionEvent;
    use diffdeck_core::model::{AlignedLine, FileDiff, FileSides, FileStatus, HunkSpan, Revset, Side};
    use diffdeck_core::provider::{DiffProvider, DiffResult, ProviderFactory};
    use diffdeck_core::session::Lifecycle;
    use diffdeck_core::vcs::VcsKind;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixed(Vec<FileDiff>);

    impl DiffProvider for Fixed {
        fn vcs_kind(&self) -> VcsKind {
            VcsKind::Git
        }

        fn fetch(&mut self, _revset: &Revset) -> Result<DiffResult, ProviderError> {
            Ok(DiffResult::from_files(self.0.clone()))
        }
    }

    impl ProviderFactory for Fixed {
        fn bind(&self, _vcs: VcsKind) -> Result<Box<dyn DiffProvider>, ProviderError> {
            Ok(Box::new(Fixed(self.0.clone())))
        }
    }

    /// Six rows; row 2 exists only on the right, hunks at rows 2 and 4.
    fn file(path: &str) -> FileDiff {
        let mut f = FileDiff::summary(path, FileStatus::Modified, 2, 1);
        f.aligned_lines = vec![
            AlignedLine::new(Some(1), Some(1)),
            AlignedLine::new(Some(2), Some(2)),
            AlignedLine::new(None, Some(3)),
            AlignedLine::new(Some(3), Some(4)),
            AlignedLine::new(Some(4), Some(5)),
            AlignedLine::new(Some(5), Some(6)),
        ];
        f.hunks = vec![HunkSpan::new(2, 3), HunkSpan::new(4, 5)];
        f.sides = FileSides {
            left: (1..=5).map(|n| format!("old {n}")).collect(),
            right: (1..=6).map(|n| format!("new {n}")).collect(),
        };
        f
    }

    async fn open(files: Vec<FileDiff>) -> (Controller, ViewState, UnboundedReceiver<SessionEvent>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(TuiHost::new(), Box::new(Fixed(files)), VcsKind::Git, "/nonexistent", tx);
        let config = SessionConfig { watch_enabled: false, ..SessionConfig::default() };
        controller.open(Revset::Unstaged, config).unwrap();
        let event = rx.recv().await.unwrap();
        controller.handle_event(event).unwrap();
        let view = ViewState { diff_viewport_height: 20, ..ViewState::default() };
        (controller, view, rx)
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn code(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn opening_shows_the_first_file_in_tree_order() {
        let (controller, _view, _rx) = open(vec![file("b.txt"), file("a/x.txt")]).await;
        assert_eq!(controller.host().current_file().unwrap().path, "a/x.txt");
        assert_eq!(controller.host().tree_cursor(), 0);
    }

    #[tokio::test]
    async fn row_keys_move_the_cursor_within_bounds() {
        let (mut c, mut view, _rx) = open(vec![file("a.txt")]).await;
        handle_key(press('k'), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(0));

        handle_key(press('j'), &mut c, &mut view);
        handle_key(code(KeyCode::Down), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(2));
        assert_eq!(c.session().cursor_row(), 2);
        assert_eq!(c.host().selection().unwrap().hunk, Some(0));

        handle_key(press('G'), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(5));
        handle_key(press('j'), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(5));
    }

    #[tokio::test]
    async fn file_and_hunk_keys_go_through_the_controller() {
        let (mut c, mut view, _rx) = open(vec![file("b.txt"), file("a.txt")]).await;
        handle_key(press(']'), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(2));
        handle_key(press(']'), &mut c, &mut view);
        assert_eq!(c.host().cursor_row(), Some(4));

        handle_key(press('}'), &mut c, &mut view);
        assert_eq!(c.host().current_file().unwrap().path, "b.txt");
        handle_key(press('{'), &mut c, &mut view);
        assert_eq!(c.host().current_file().unwrap().path, "a.txt");
    }

    #[tokio::test]
    async fn enter_on_filler_resolves_to_the_nearest_line() {
        let (mut c, mut view, _rx) = open(vec![file("a.txt")]).await;
        view.focus = PanelFocus::Left;
        handle_key(press('j'), &mut c, &mut view);
        handle_key(press('j'), &mut c, &mut view);
        handle_key(code(KeyCode::Enter), &mut c, &mut view);

        let goto = view.last_goto.clone().unwrap();
        assert_eq!(goto.side, Side::Left);
        assert_eq!(goto.path, "a.txt");
        assert_eq!(goto.line, 2);
        assert_eq!(c.host().cursor_row(), Some(1));
    }

    #[tokio::test]
    async fn enter_on_the_tree_opens_the_file_under_the_cursor() {
        let (mut c, mut view, _rx) = open(vec![file("a.txt"), file("b.txt")]).await;
        view.focus = PanelFocus::Right;
        handle_key(code(KeyCode::Tab), &mut c, &mut view);
        assert_eq!(view.focus, PanelFocus::FileTree);

        handle_key(press('j'), &mut c, &mut view);
        assert_eq!(c.host().tree_cursor(), 1);
        assert_eq!(c.host().current_file().unwrap().path, "a.txt");

        handle_key(code(KeyCode::Enter), &mut c, &mut view);
        assert_eq!(c.host().current_file().unwrap().path, "b.txt");
        assert_eq!(view.focus, PanelFocus::Right);
    }

    #[tokio::test]
    async fn help_mode_swallows_navigation() {
        let (mut c, mut view, _rx) = open(vec![file("a.txt")]).await;
        handle_key(press('?'), &mut c, &mut view);
        assert_eq!(view.mode, Mode::Help);
        handle_key(press('j'), &mut c, &mut view);
        assert_eq!(view.help_scroll, 1);
        assert_eq!(c.host().cursor_row(), Some(0));
        handle_key(code(KeyCode::Esc), &mut c, &mut view);
        assert_eq!(view.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn quit_closes_the_session() {
        let (mut c, mut view, _rx) = open(vec![file("a.txt")]).await;
        assert_eq!(handle_key(press('q'), &mut c, &mut view), KeyAction::Quit);
        assert_eq!(c.lifecycle(), Lifecycle::Closed);
        assert!(!c.host().has_session());
    }
}
