//! Side-by-side diff panes.
//!
//! Both panes draw the same window of aligned rows, so they scroll together
//! and a row always lines up with its counterpart. Only the visible slice
//! `rows[diff_scroll..diff_scroll + height]` is turned into list items.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use diffdeck_core::model::{FileDiff, Side};

use crate::app::ViewState;
use crate::host::TuiHost;
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

const TAB: &str = "    ";

pub fn render_diff_pane(
    frame: &mut Frame,
    area: Rect,
    side: Side,
    is_focused: bool,
    host: &TuiHost,
    view: &ViewState,
    theme: &Theme,
) {
    let inner = inner_rect(area);
    let Some(file) = host.current_file() else {
        frame.render_widget(panel_block(pane_title(None, side), is_focused, theme), area);
        frame.render_widget(List::new([ListItem::new("No file selected")]), inner);
        return;
    };
    frame.render_widget(panel_block(pane_title(Some(file), side), is_focused, theme), area);

    if file.aligned_lines.is_empty() {
        let msg = "Binary file or no textual changes";
        frame.render_widget(List::new([ListItem::new(msg)]), inner);
        return;
    }

    let cursor = host.cursor_row();
    let total = file.row_count();
    let start = view.diff_scroll.min(total.saturating_sub(1));
    let end = (start + usize::from(inner.height)).min(total);
    let gutter = gutter_width(file);

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let mut line = diff_line(file, row, side, gutter, usize::from(inner.width), theme);
            if cursor == Some(row) {
                line = line.style(Style::default().bg(theme.cursor_bg));
            }
            ListItem::new(line)
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn pane_title(file: Option<&FileDiff>, side: Side) -> String {
    let label = match side {
        Side::Left => "old",
        Side::Right => "new",
    };
    match file {
        Some(file) => format!("{} ({label})", file.path_for(side)),
        None => format!("Diff ({label})"),
    }
}

/// Digits needed for the largest line number on either side, at least 3.
fn gutter_width(file: &FileDiff) -> usize {
    let max = file.sides.left.len().max(file.sides.right.len());
    max.to_string().len().max(3)
}

/// One row of one pane. Rows with no line on this side are filler.
fn diff_line(file: &FileDiff, row: usize, side: Side, gutter: usize, width: usize, theme: &Theme) -> Line<'static> {
    let Some(number) = file.aligned_lines[row].line(side) else {
        let fill = "╱".repeat(width);
        return Line::from(Span::styled(fill, Style::default().fg(theme.diff_filler)));
    };

    let changed = file.hunk_at(row).is_some_and(|h| file.hunks[h].contains(row));
    let style = match (changed, side) {
        (false, _) => Style::default().fg(theme.diff_context),
        (true, Side::Left) => Style::default().fg(theme.diff_removed).bg(theme.diff_removed_bg),
        (true, Side::Right) => Style::default().fg(theme.diff_added).bg(theme.diff_added_bg),
    };
    let text = file.sides.text(side, number).unwrap_or_default().replace('\t', TAB);

    Line::from(vec![
        Span::styled(format!("{number:>gutter$} "), Style::default().fg(theme.line_number)),
        Span::styled(text, style),
    ])
}
