//! File tree pane.
//!
//! The host hands over files already in display order, where each directory's
//! contents are contiguous. That makes the tree a single pass: a directory
//! header is emitted whenever a path leaves the previous path's directories.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use diffdeck_core::model::FileStatus;

use crate::host::{FileEntry, TuiHost};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

/// One visual row of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRow<'a> {
    Dir { name: &'a str, depth: usize },
    /// `pos` indexes the host's display-ordered file list.
    File { pos: usize, name: &'a str, depth: usize },
}

pub fn tree_rows(entries: &[FileEntry]) -> Vec<TreeRow<'_>> {
    let mut rows = Vec::with_capacity(entries.len());
    let mut prev_dirs: Vec<&str> = Vec::new();
    for (pos, entry) in entries.iter().enumerate() {
        let mut parts: Vec<&str> = entry.path.split('/').collect();
        let name = parts.pop().unwrap_or_default();
        let common = prev_dirs.iter().zip(&parts).take_while(|(a, b)| a == b).count();
        for (offset, dir) in parts[common..].iter().enumerate() {
            rows.push(TreeRow::Dir { name: *dir, depth: common + offset });
        }
        rows.push(TreeRow::File { pos, name, depth: parts.len() });
        prev_dirs = parts;
    }
    rows
}

pub fn render_file_tree(frame: &mut Frame, area: Rect, is_focused: bool, host: &TuiHost, theme: &Theme) {
    let entries = host.files();
    let title = if entries.is_empty() {
        "Files".to_owned()
    } else {
        format!("Files ({})", entries.len())
    };
    let block = panel_block(title, is_focused, theme);

    let rows = tree_rows(entries);
    let current = host.highlighted();
    let mut selected = None;
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| match *row {
            TreeRow::Dir { name, depth } => ListItem::new(Line::from(vec![
                Span::raw("  ".repeat(depth)),
                Span::styled(format!("{name}/"), Style::default().fg(theme.directory)),
            ])),
            TreeRow::File { pos, name, depth } => {
                if pos == host.tree_cursor() {
                    selected = Some(i);
                }
                let entry = &entries[pos];
                file_item(entry, name, depth, current == Some(entry.index), theme)
            }
        })
        .collect();

    let highlight = if is_focused {
        Style::default().bg(theme.cursor_bg)
    } else {
        Style::default()
    };
    let list = List::new(items).block(block).highlight_style(highlight);
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

/// `  M name.rs  +4 -1`, bold when it is the file on display.
fn file_item(entry: &FileEntry, name: &str, depth: usize, is_current: bool, theme: &Theme) -> ListItem<'static> {
    let badge_color = match entry.status {
        FileStatus::Added => theme.file_added,
        FileStatus::Deleted => theme.file_removed,
        FileStatus::Renamed => theme.file_renamed,
        FileStatus::Modified => theme.file_modified,
    };
    let name_style = if is_current {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw("  ".repeat(depth)),
        Span::styled(format!("{} ", entry.status.badge()), Style::default().fg(badge_color)),
        Span::styled(name.to_owned(), name_style),
    ];
    if entry.additions > 0 || entry.deletions > 0 {
        spans.push(Span::styled(
            format!("  +{} -{}", entry.additions, entry.deletions),
            Style::default().fg(theme.line_number),
        ));
    }
    ListItem::new(Line::from(spans))
}
