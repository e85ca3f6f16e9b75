//! Owned data types describing one diff result.
//!
//! Everything here is fully owned and `Send` so a provider running on the
//! worker thread can hand its result to the controller on the primary thread
//! without borrowing from repository handles.

use std::fmt;
use std::ops::Range;

/// Change kind for one file in a diff result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    /// Single-letter badge used by file lists: `A`, `M`, `D`, `R`.
    pub fn badge(self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        };
        f.write_str(name)
    }
}

/// Which pane of the side-by-side view a row or location refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// The old version (base of the comparison).
    Left,
    /// The new version. Goto-line targets this side unless told otherwise.
    #[default]
    Right,
}

/// One rendered row: an optional 1-based line number on each side.
///
/// A row with only `left` is a deletion (the right pane shows filler); a row
/// with only `right` is an insertion. At least one side is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedLine {
    pub left: Option<u32>,
    pub right: Option<u32>,
}

impl AlignedLine {
    pub fn new(left: Option<u32>, right: Option<u32>) -> Self {
        debug_assert!(left.is_some() || right.is_some(), "aligned row with no sides");
        Self { left, right }
    }

    /// Line number carried on `side`, if any.
    pub fn line(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Half-open row range `[start, end)` into a file's `aligned_lines` covering
/// one hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkSpan {
    pub start: usize,
    pub end: usize,
}

impl HunkSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows().contains(&row)
    }
}

/// Text of both versions of a file, one entry per source line.
///
/// Hosts use this to draw rows; line `n` of a side lives at index `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSides {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl FileSides {
    /// Text of 1-based `line` on `side`, or `None` when out of range.
    pub fn text(&self, side: Side, line: u32) -> Option<&str> {
        let lines = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        let idx = usize::try_from(line).ok()?.checked_sub(1)?;
        lines.get(idx).map(String::as_str)
    }
}

/// One changed file as returned by a diff provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Repository-relative path, unique within a session.
    pub path: String,
    /// Source path when `status` is `Renamed`.
    pub old_path: Option<String>,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
    /// Row space of the rendered panes.
    pub aligned_lines: Vec<AlignedLine>,
    /// Hunks in ascending row order.
    pub hunks: Vec<HunkSpan>,
    pub sides: FileSides,
}

impl FileDiff {
    /// A file with counts only and no rows. Mostly useful for tests and for
    /// binary files where no alignment exists.
    pub fn summary(path: impl Into<String>, status: FileStatus, additions: u32, deletions: u32) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            status,
            additions,
            deletions,
            aligned_lines: Vec::new(),
            hunks: Vec::new(),
            sides: FileSides::default(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.aligned_lines.len()
    }

    /// Path shown for `side`: the rename source on the left when present.
    pub fn path_for(&self, side: Side) -> &str {
        match side {
            Side::Left => self.old_path.as_deref().unwrap_or(&self.path),
            Side::Right => &self.path,
        }
    }

    /// Index of the hunk containing or most recently preceding `row`.
    pub fn hunk_at(&self, row: usize) -> Option<usize> {
        self.hunks.iter().rposition(|h| h.start <= row)
    }
}

/// Revision selector a session's diff is computed against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Revset {
    /// Working tree changes not yet staged.
    #[default]
    Unstaged,
    /// Staged changes (index against HEAD).
    Staged,
    /// An explicit revision or range token, passed to the provider verbatim.
    Range(String),
}

impl fmt::Display for Revset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revset::Unstaged => f.write_str("unstaged"),
            Revset::Staged => f.write_str("staged"),
            Revset::Range(token) => f.write_str(token),
        }
    }
}

/// A resolved source position produced by goto-line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub side: Side,
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, passed through from the request.
    pub col: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.col)
    }
}
