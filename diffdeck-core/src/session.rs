//! In-memory state of one diff session.
//!
//! `SessionState` is owned by the controller and passed by reference into the
//! navigation and reconciliation functions. Selection is stored as a 0-based
//! provider index; it is `Some` exactly when the file list is non-empty.

use std::fmt;

use uuid::Uuid;

use crate::fingerprint::Fingerprint;
use crate::model::{FileDiff, Revset};
use crate::navigation;

/// Identity of one opened session. A fresh id is minted for every open so
/// late events from a previous session can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id of a session that was never opened.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Lifecycle of a session as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// No resources held. Initial and terminal state; a closed controller can
    /// be opened again.
    #[default]
    Closed,
    /// Waiting for the first provider result.
    Opening,
    /// Surfaces exist and the session accepts refresh and navigation.
    Open,
    /// Releasing watcher and surfaces.
    Closing,
}

/// What the host needs to draw the current file: which file, where the cursor
/// is, and which hunk that row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Provider-order index of the selected file.
    pub index: usize,
    /// Cursor row within the file's aligned rows.
    pub row: usize,
    /// Hunk containing or preceding `row`.
    pub hunk: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    id: SessionId,
    revset: Revset,
    files: Vec<FileDiff>,
    display_order: Vec<usize>,
    current: Option<usize>,
    cursor_row: usize,
    fingerprint: Option<Fingerprint>,
}

impl SessionState {
    pub fn new(id: SessionId, revset: Revset) -> Self {
        Self {
            id,
            revset,
            ..Self::default()
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn revset(&self) -> &Revset {
        &self.revset
    }

    /// Points the session at a different revision selector.
    ///
    /// The stored fingerprint is dropped so the next result re-renders even if
    /// its metadata happens to match the old selector's.
    pub fn set_revset(&mut self, revset: Revset) {
        if self.revset != revset {
            self.revset = revset;
            self.fingerprint = None;
        }
    }

    /// Files in provider order.
    pub fn files(&self) -> &[FileDiff] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Provider indices in tree display order.
    pub fn display_order(&self) -> &[usize] {
        &self.display_order
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_file(&self) -> Option<&FileDiff> {
        self.current.and_then(|idx| self.files.get(idx))
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn selection(&self) -> Option<Selection> {
        let index = self.current?;
        let file = self.files.get(index)?;
        Some(Selection {
            index,
            row: self.cursor_row,
            hunk: file.hunk_at(self.cursor_row),
        })
    }

    /// Provider index of the file at `path`, by exact match.
    pub fn position_of(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }

    /// Replaces the file list and everything derived from it. Selection is
    /// cleared; callers pick the new one.
    pub(crate) fn replace_files(&mut self, files: Vec<FileDiff>, fingerprint: Fingerprint) {
        self.display_order = navigation::display_order(&files);
        self.files = files;
        self.fingerprint = Some(fingerprint);
        self.current = None;
        self.cursor_row = 0;
    }

    /// Selects `index` with the cursor on its first hunk (row 0 without hunks).
    ///
    /// Returns `false` and leaves the selection alone when `index` is out of
    /// range.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(file) = self.files.get(index) else {
            return false;
        };
        self.cursor_row = file.hunks.first().map_or(0, |h| h.start);
        self.current = Some(index);
        true
    }

    /// Selects `index` with the cursor on `row`, clamped to the file's rows.
    pub fn select_at_row(&mut self, index: usize, row: usize) -> bool {
        let Some(file) = self.files.get(index) else {
            return false;
        };
        self.cursor_row = row.min(file.row_count().saturating_sub(1));
        self.current = Some(index);
        true
    }

    /// Moves the cursor within the current file. No-op without a selection.
    pub fn set_cursor_row(&mut self, row: usize) -> bool {
        let Some(file) = self.current_file() else {
            return false;
        };
        let clamped = row.min(file.row_count().saturating_sub(1));
        self.cursor_row = clamped;
        true
    }
}
