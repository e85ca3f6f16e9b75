//! File and hunk navigation.
//!
//! Files are visited in tree display order rather than provider order: paths
//! are compared one segment at a time, and at the first differing segment a
//! directory sorts before a file. Within a file the cursor jumps between hunk
//! starts. Whether a failed hunk step wraps into the next file is the
//! controller's decision; [`wrap_next_hunk`] and [`wrap_prev_hunk`] implement
//! the wrap itself.

use std::cmp::Ordering;

use crate::model::{FileDiff, Side};
use crate::session::SessionState;

/// Orders two repository-relative paths the way a file tree lists them.
pub fn compare_tree_paths(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/').peekable();
    let mut right = b.split('/').peekable();
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => {
                let l_is_dir = left.peek().is_some();
                let r_is_dir = right.peek().is_some();
                if l == r && l_is_dir == r_is_dir {
                    continue;
                }
                return match (l_is_dir, r_is_dir) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => l.cmp(r),
                };
            }
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

/// Permutation of provider indices in tree display order.
pub fn display_order(files: &[FileDiff]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..files.len()).collect();
    order.sort_by(|&a, &b| compare_tree_paths(&files[a].path, &files[b].path));
    order
}

pub fn first_in_display_order(order: &[usize]) -> Option<usize> {
    order.first().copied()
}

/// Provider index following `index` in display order, `None` at the end or
/// when `index` is not part of the order.
pub fn next_in_display_order(order: &[usize], index: usize) -> Option<usize> {
    let pos = order.iter().position(|&i| i == index)?;
    order.get(pos + 1).copied()
}

pub fn prev_in_display_order(order: &[usize], index: usize) -> Option<usize> {
    let pos = order.iter().position(|&i| i == index)?;
    pos.checked_sub(1).map(|p| order[p])
}

/// Moves the cursor to the start of the next hunk in the current file.
///
/// Returns `false` when there is no selection or the cursor is already on or
/// after the last hunk start.
pub fn next_hunk(session: &mut SessionState) -> bool {
    let row = session.cursor_row();
    let Some(file) = session.current_file() else {
        return false;
    };
    let Some(target) = file.hunks.iter().find(|h| h.start > row).map(|h| h.start) else {
        return false;
    };
    session.set_cursor_row(target)
}

/// Moves the cursor to the start of the nearest hunk beginning before it.
///
/// From the middle of a hunk this lands on that hunk's own start.
pub fn prev_hunk(session: &mut SessionState) -> bool {
    let row = session.cursor_row();
    let Some(file) = session.current_file() else {
        return false;
    };
    let Some(target) = file.hunks.iter().rev().find(|h| h.start < row).map(|h| h.start) else {
        return false;
    };
    session.set_cursor_row(target)
}

/// Cross-file forward wrap: selects the first hunk of the next display-order
/// file that has one, cycling past the end.
///
/// Each file is tried at most once, the current file last, so the scan ends
/// even when no file has a hunk. Returns the newly selected provider index.
pub fn wrap_next_hunk(session: &mut SessionState) -> Option<usize> {
    let (pos, len) = wrap_origin(session)?;
    let target = (1..=len)
        .map(|step| session.display_order()[(pos + step) % len])
        .find(|&idx| !session.files()[idx].hunks.is_empty())?;
    session.select(target);
    Some(target)
}

/// Cross-file backward wrap: selects the last hunk of the previous
/// display-order file that has one, cycling past the start.
pub fn wrap_prev_hunk(session: &mut SessionState) -> Option<usize> {
    let (pos, len) = wrap_origin(session)?;
    let target = (1..=len)
        .map(|step| session.display_order()[(pos + len - step) % len])
        .find(|&idx| !session.files()[idx].hunks.is_empty())?;
    let last_start = session.files()[target].hunks.last().map(|h| h.start)?;
    session.select_at_row(target, last_start);
    Some(target)
}

fn wrap_origin(session: &SessionState) -> Option<(usize, usize)> {
    let current = session.current()?;
    let order = session.display_order();
    let pos = order.iter().position(|&i| i == current)?;
    Some((pos, order.len()))
}

/// Finds the row nearest to `row` whose entry carries a line number on `side`.
///
/// Scans outward from `row`: the row itself first, then for each radius the
/// row above before the row below. Filler rows on the target side therefore
/// resolve upward when equidistant. Returns the row and its line number.
pub fn nearest_mapped_row(file: &FileDiff, row: usize, side: Side) -> Option<(usize, u32)> {
    let rows = &file.aligned_lines;
    if rows.is_empty() {
        return None;
    }
    let origin = row.min(rows.len() - 1);
    let hit = |r: usize| rows[r].line(side).map(|line| (r, line));

    if let Some(found) = hit(origin) {
        return Some(found);
    }
    for radius in 1..rows.len() {
        let above = origin.checked_sub(radius);
        let below = origin + radius;
        if above.is_none() && below >= rows.len() {
            break;
        }
        if let Some(found) = above.and_then(hit) {
            return Some(found);
        }
        if below < rows.len() {
            if let Some(found) = hit(below) {
                return Some(found);
            }
        }
    }
    None
}
