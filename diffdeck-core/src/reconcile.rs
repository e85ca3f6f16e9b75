//! Applying a fresh provider result to an open session.
//!
//! A refresh that produces the same fingerprint is a no-op. Otherwise the file
//! list is replaced and the selection follows the previously selected path,
//! falling back to the first file in provider order when that path is gone.

use crate::fingerprint::Fingerprint;
use crate::model::FileDiff;
use crate::navigation;
use crate::provider::DiffResult;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The result holds no files. The session was not modified; the caller
    /// closes it.
    Emptied,
    /// Same fingerprint as the current file list. Nothing to redraw.
    Unchanged,
    Changed {
        /// Provider index selected after the update.
        selected: usize,
        /// Whether the previously selected path is still the selection.
        preserved: bool,
    },
}

pub fn reconcile(session: &mut SessionState, result: DiffResult) -> Reconciliation {
    let files = match result {
        DiffResult::Files(files) if !files.is_empty() => files,
        _ => return Reconciliation::Emptied,
    };

    let fingerprint = Fingerprint::of(&files);
    if session.fingerprint() == Some(&fingerprint) {
        return Reconciliation::Unchanged;
    }

    let previous_path = session.current_file().map(|f| f.path.clone());
    let previous_row = session.cursor_row();
    session.replace_files(files, fingerprint);

    match previous_path.and_then(|path| session.position_of(&path)) {
        Some(index) => {
            session.select_at_row(index, previous_row);
            Reconciliation::Changed { selected: index, preserved: true }
        }
        None => {
            session.select(0);
            Reconciliation::Changed { selected: 0, preserved: false }
        }
    }
}

/// Installs the first result of a session and selects the first file in
/// display order. Returns the selected provider index, `None` for an empty
/// list.
pub fn populate(session: &mut SessionState, files: Vec<FileDiff>) -> Option<usize> {
    let fingerprint = Fingerprint::of(&files);
    session.replace_files(files, fingerprint);
    let first = navigation::first_in_display_order(session.display_order())?;
    session.select(first);
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlignedLine, FileStatus, HunkSpan, Revset};
    use crate::session::SessionId;

    fn file(path: &str, additions: u32) -> FileDiff {
        let mut f = FileDiff::summary(path, FileStatus::Modified, additions, 0);
        f.aligned_lines = (1..=20).map(|n| AlignedLine::new(Some(n), Some(n))).collect();
        f.hunks = vec![HunkSpan::new(4, 6)];
        f
    }

    fn opened(files: Vec<FileDiff>) -> SessionState {
        let mut s = SessionState::new(SessionId::new(), Revset::Unstaged);
        populate(&mut s, files);
        s
    }

    #[test]
    fn populate_selects_first_in_display_order() {
        let s = opened(vec![file("b.txt", 1), file("a/x.txt", 1)]);
        assert_eq!(s.current(), Some(1));
        assert_eq!(s.cursor_row(), 4);
    }

    #[test]
    fn identical_result_is_unchanged() {
        let files = vec![file("a.rs", 1), file("b.rs", 2)];
        let mut s = opened(files.clone());
        s.select(1);
        s.set_cursor_row(9);
        assert_eq!(reconcile(&mut s, DiffResult::Files(files)), Reconciliation::Unchanged);
        assert_eq!(s.current(), Some(1));
        assert_eq!(s.cursor_row(), 9);
    }

    #[test]
    fn selection_follows_path_to_its_new_index() {
        let mut s = opened(vec![file("a.rs", 1), file("b.rs", 2)]);
        s.select(1);
        s.set_cursor_row(12);

        let outcome = reconcile(
            &mut s,
            DiffResult::Files(vec![file("new.rs", 3), file("a.rs", 1), file("b.rs", 5)]),
        );
        assert_eq!(outcome, Reconciliation::Changed { selected: 2, preserved: true });
        assert_eq!(s.current_file().unwrap().path, "b.rs");
        assert_eq!(s.cursor_row(), 12);
    }

    #[test]
    fn vanished_path_falls_back_to_provider_index_zero() {
        let mut s = opened(vec![file("a.rs", 1), file("b.rs", 2)]);
        s.select(1);

        // Display order would put `lib/c.rs` first; the fallback ignores that.
        let outcome = reconcile(&mut s, DiffResult::Files(vec![file("z.rs", 1), file("lib/c.rs", 1)]));
        assert_eq!(outcome, Reconciliation::Changed { selected: 0, preserved: false });
        assert_eq!(s.current_file().unwrap().path, "z.rs");
        assert_eq!(s.cursor_row(), 4);
    }

    #[test]
    fn empty_result_leaves_session_untouched() {
        let mut s = opened(vec![file("a.rs", 1)]);
        let before = s.fingerprint().cloned();
        assert_eq!(reconcile(&mut s, DiffResult::Empty), Reconciliation::Emptied);
        assert_eq!(reconcile(&mut s, DiffResult::Files(Vec::new())), Reconciliation::Emptied);
        assert_eq!(s.fingerprint().cloned(), before);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cleared_fingerprint_forces_rerender() {
        let files = vec![file("a.rs", 1)];
        let mut s = opened(files.clone());
        s.set_revset(Revset::Staged);
        assert_eq!(
            reconcile(&mut s, DiffResult::Files(files)),
            Reconciliation::Changed { selected: 0, preserved: true }
        );
    }
}
