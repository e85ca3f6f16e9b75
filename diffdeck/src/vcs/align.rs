//! Turns zero-context change regions into the full-file row space of the
//! side-by-side view.
//!
//! Both providers describe a file as a list of [`ChangeRegion`]s (git from
//! `@@` headers with zero context lines, jj from a `similar` line diff). Lines
//! outside every region are unchanged and pair up one-to-one; inside a region
//! removed and added lines are paired top to bottom and the longer side's
//! surplus gets filler on the other side.

use diffdeck_core::model::{AlignedLine, HunkSpan};

/// One contiguous change. Starts are 0-based line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRegion {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
}

impl ChangeRegion {
    /// Converts a unified-diff hunk header.
    ///
    /// A side with zero lines names the line *after which* the change sits,
    /// so its 1-based number is already the 0-based index of the next line.
    pub fn from_header(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        let start = |n: u32, len: u32| {
            let n = n as usize;
            if len == 0 {
                n
            } else {
                n.saturating_sub(1)
            }
        };
        Self {
            old_start: start(old_start, old_lines),
            old_len: old_lines as usize,
            new_start: start(new_start, new_lines),
            new_len: new_lines as usize,
        }
    }

    fn old_end(&self) -> usize {
        self.old_start + self.old_len
    }

    fn new_end(&self) -> usize {
        self.new_start + self.new_len
    }
}

/// Merges regions that touch on both sides. `similar` reports a replaced
/// block as a delete followed by an insert at the same position.
pub fn coalesce(regions: impl IntoIterator<Item = ChangeRegion>) -> Vec<ChangeRegion> {
    let mut out: Vec<ChangeRegion> = Vec::new();
    for region in regions {
        match out.last_mut() {
            Some(prev) if prev.old_end() == region.old_start && prev.new_end() == region.new_start => {
                prev.old_len += region.old_len;
                prev.new_len += region.new_len;
            }
            _ => out.push(region),
        }
    }
    out
}

/// Builds the aligned rows for a file with `old_len` and `new_len` lines and
/// the hunk spans over those rows. `regions` must be sorted and disjoint.
pub fn align(old_len: usize, new_len: usize, regions: &[ChangeRegion]) -> (Vec<AlignedLine>, Vec<HunkSpan>) {
    let mut rows = Vec::with_capacity(old_len.max(new_len));
    let mut hunks = Vec::with_capacity(regions.len());
    let (mut old, mut new) = (0usize, 0usize);

    for region in regions {
        context(&mut rows, &mut old, &mut new, region.old_start.min(old_len), region.new_start.min(new_len));

        let start = rows.len();
        let removed = region.old_len.min(old_len.saturating_sub(old));
        let added = region.new_len.min(new_len.saturating_sub(new));
        for i in 0..removed.max(added) {
            let left = (i < removed).then(|| line_number(old + i));
            let right = (i < added).then(|| line_number(new + i));
            rows.push(AlignedLine::new(left, right));
        }
        old += removed;
        new += added;
        if rows.len() > start {
            hunks.push(HunkSpan::new(start, rows.len()));
        }
    }
    context(&mut rows, &mut old, &mut new, old_len, new_len);
    (rows, hunks)
}

/// Emits unchanged rows up to the given positions. Gaps of unequal length
/// only happen with inconsistent input; the surplus is emitted one-sided.
fn context(rows: &mut Vec<AlignedLine>, old: &mut usize, new: &mut usize, old_to: usize, new_to: usize) {
    while *old < old_to && *new < new_to {
        rows.push(AlignedLine::new(Some(line_number(*old)), Some(line_number(*new))));
        *old += 1;
        *new += 1;
    }
    while *old < old_to {
        rows.push(AlignedLine::new(Some(line_number(*old)), None));
        *old += 1;
    }
    while *new < new_to {
        rows.push(AlignedLine::new(None, Some(line_number(*new))));
        *new += 1;
    }
}

fn line_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
