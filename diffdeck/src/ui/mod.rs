//! Rendering. [`render`] is the single entry point called from
//! `terminal.draw()`; layout arithmetic lives in `layout`, each pane in its
//! own module.

mod layout;
pub mod diff_view;
pub mod file_tree;
pub mod help;
pub mod keybindings;

use ratatui::{
    layout::Rect,
    widgets::{Block, Paragraph},
    Frame,
};

use diffdeck_core::controller::SessionController;
use diffdeck_core::model::Side;

use crate::app::{Mode, PanelFocus, ViewState};
use crate::host::TuiHost;
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar, StatusInfo};

/// Draws one frame. Viewport sizes are written back into `view` so the next
/// keypress can compute page distances.
pub fn render(frame: &mut Frame, controller: &SessionController<TuiHost>, view: &mut ViewState, theme: &Theme) {
    let [tree, left, right, status_bar] = compute_layout(frame.area());
    view.tree_viewport_height = inner_rect(tree).height;
    view.diff_viewport_height = inner_rect(left).height;
    view.panel_rects = [tree, left, right];

    let host = controller.host();
    if host.has_session() {
        if tree.width > 0 {
            file_tree::render_file_tree(frame, tree, view.focus == PanelFocus::FileTree, host, theme);
        }
        diff_view::render_diff_pane(frame, left, Side::Left, view.focus == PanelFocus::Left, host, view, theme);
        diff_view::render_diff_pane(frame, right, Side::Right, view.focus == PanelFocus::Right, host, view, theme);
    } else {
        render_idle(frame, Rect::union(tree, right), theme);
    }

    render_status_bar(frame, status_bar, &status_info(controller, view), view, theme);

    if view.mode == Mode::Help {
        help::render_help_overlay(frame, theme, view.help_scroll);
    }
}

fn render_idle(frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = Block::bordered().border_style(ratatui::style::Style::default().fg(theme.border_inactive));
    frame.render_widget(Paragraph::new("Waiting for changes...").block(block).centered(), area);
}

fn status_info(controller: &SessionController<TuiHost>, view: &ViewState) -> StatusInfo {
    let host = controller.host();
    let source = format!("{} {}", controller.vcs(), controller.session().revset());
    let file = host
        .highlighted()
        .and_then(|index| host.files().iter().position(|e| e.index == index))
        .map(|pos| (pos + 1, host.files().len()));
    let hunk = host.current_file().zip(host.selection()).and_then(|(file, selection)| {
        selection.hunk.map(|h| (h + 1, file.hunks.len()))
    });
    let message = view
        .status
        .as_ref()
        .map(|s| s.text.clone())
        .or_else(|| host.notice().map(ToString::to_string));
    StatusInfo { source, file, hunk, message }
}
