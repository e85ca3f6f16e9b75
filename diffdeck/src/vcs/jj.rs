//! Diff provider that shells out to the `jj` CLI.
//!
//! The file list comes from `jj diff --summary`; each file's two sides are
//! read with `jj file show` and aligned locally with `similar`.
//!
//! The summary command is the one place the provider lets jj snapshot the
//! working copy. Without the snapshot, edits made since the last jj command
//! would not show up. The snapshot records a new operation, which moves
//! `op_heads/heads` and so wakes the change watcher once more; that refresh
//! comes back unchanged. Every later read in the same fetch passes
//! `--ignore-working-copy` and sees the snapshot just taken.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use similar::{DiffTag, TextDiff};
use tracing::debug;

use diffdeck_core::error::ProviderError;
use diffdeck_core::model::{FileDiff, FileSides, FileStatus, Revset};
use diffdeck_core::provider::{DiffProvider, DiffResult};
use diffdeck_core::vcs::VcsKind;

use crate::vcs::align::{align, coalesce, ChangeRegion};

const JJ: &str = "jj";

pub struct JjProvider {
    workdir: PathBuf,
}

impl JjProvider {
    /// Fails when the `jj` binary cannot be run.
    pub fn open(workdir: &Path) -> Result<Self, ProviderError> {
        let output = Command::new(JJ)
            .arg("--version")
            .output()
            .map_err(|e| ProviderError::Unavailable(format!("cannot run {JJ}: {e}")))?;
        if !output.status.success() {
            return Err(ProviderError::Unavailable(stderr_of(&output)));
        }
        Ok(Self { workdir: workdir.to_path_buf() })
    }

    fn run(&self, args: &[&str]) -> Result<Output, ProviderError> {
        Command::new(JJ)
            .args(["--no-pager", "--color=never"])
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| ProviderError::Unavailable(format!("cannot run {JJ}: {e}")))
    }

    fn file_text(&self, rev: &str, path: &str) -> Result<Option<String>, ProviderError> {
        let fileset = format!("root-file:{path:?}");
        let output = self.run(&show_args(rev, &fileset))?;
        if !output.status.success() {
            return Err(ProviderError::Unavailable(stderr_of(&output)));
        }
        if output.stdout.contains(&0) {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

impl DiffProvider for JjProvider {
    fn vcs_kind(&self) -> VcsKind {
        VcsKind::Jj
    }

    fn fetch(&mut self, revset: &Revset) -> Result<DiffResult, ProviderError> {
        let target = Target::from_revset(revset);
        let output = self.run(&target.summary_args())?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            return Err(match revset {
                Revset::Range(token) if mentions_revision(&stderr) => {
                    ProviderError::UnsupportedRevset(token.clone())
                }
                _ => ProviderError::Unavailable(stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut files = Vec::new();
        for line in stdout.lines() {
            let Some(entry) = parse_summary_line(line) else {
                debug!(line, "skipping unrecognised summary line");
                continue;
            };
            files.push(self.load_file(&target, entry)?);
        }
        debug!(revset = %revset, files = files.len(), "jj diff collected");
        Ok(DiffResult::from_files(files))
    }
}

impl JjProvider {
    fn load_file(&self, target: &Target, entry: SummaryEntry) -> Result<FileDiff, ProviderError> {
        let old_path = entry.old_path.as_deref().unwrap_or(&entry.path);
        let old = match entry.status {
            FileStatus::Added if entry.old_path.is_none() => Some(String::new()),
            _ => self.file_text(&target.old_rev(), old_path)?,
        };
        let new = match entry.status {
            FileStatus::Deleted => Some(String::new()),
            _ => self.file_text(target.new_rev(), &entry.path)?,
        };

        let mut file = match (old, new) {
            (Some(old), Some(new)) => file_diff(&entry.path, entry.status, &old, &new),
            _ => FileDiff::summary(entry.path.clone(), entry.status, 0, 0),
        };
        file.old_path = entry.old_path;
        Ok(file)
    }
}

/// The two revisions a fetch compares.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// One revision against its parent(s).
    Rev(String),
    Range { from: String, to: String },
}

impl Target {
    /// jj has no index, so staged and unstaged both mean the working-copy
    /// commit.
    fn from_revset(revset: &Revset) -> Self {
        match revset {
            Revset::Unstaged | Revset::Staged => Target::Rev("@".into()),
            Revset::Range(token) => match token.split_once("..") {
                Some((from, to)) => Target::Range {
                    from: if from.is_empty() { "root()".into() } else { from.into() },
                    to: if to.is_empty() { "@".into() } else { to.into() },
                },
                None => Target::Rev(token.clone()),
            },
        }
    }

    fn diff_args(&self) -> Vec<&str> {
        match self {
            Target::Rev(rev) => vec!["-r", rev.as_str()],
            Target::Range { from, to } => vec!["--from", from.as_str(), "--to", to.as_str()],
        }
    }

    /// Snapshots the working copy before diffing.
    fn summary_args(&self) -> Vec<&str> {
        let mut args = vec!["diff", "--summary"];
        args.extend(self.diff_args());
        args
    }

    fn old_rev(&self) -> String {
        match self {
            Target::Rev(rev) => format!("({rev})-"),
            Target::Range { from, .. } => from.clone(),
        }
    }

    fn new_rev(&self) -> &str {
        match self {
            Target::Rev(rev) => rev,
            Target::Range { to, .. } => to,
        }
    }
}

fn show_args<'a>(rev: &'a str, fileset: &'a str) -> [&'a str; 6] {
    ["file", "show", "--ignore-working-copy", "-r", rev, fileset]
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SummaryEntry {
    status: FileStatus,
    path: String,
    old_path: Option<String>,
}

/// Parses one line of `jj diff --summary`, e.g. `M src/lib.rs` or
/// `R src/{old.rs => new.rs}`.
fn parse_summary_line(line: &str) -> Option<SummaryEntry> {
    let (code, rest) = line.split_once(' ')?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    let status = match code {
        "A" => FileStatus::Added,
        "M" => FileStatus::Modified,
        "D" => FileStatus::Deleted,
        "R" => FileStatus::Renamed,
        "C" => FileStatus::Added,
        _ => return None,
    };
    match status {
        FileStatus::Renamed => {
            let (old, new) = split_rename(rest)?;
            Some(SummaryEntry { status, path: new, old_path: Some(old) })
        }
        // Copies keep their source so the left pane has something to show.
        FileStatus::Added if code == "C" => {
            let (old, new) = split_rename(rest)?;
            Some(SummaryEntry { status, path: new, old_path: Some(old) })
        }
        _ => Some(SummaryEntry { status, path: rest.to_owned(), old_path: None }),
    }
}

/// Expands `pre/{a => b}/suf` into the full old and new paths.
fn split_rename(spec: &str) -> Option<(String, String)> {
    let open = spec.find('{')?;
    let close = open + spec[open..].find('}')?;
    let (prefix, suffix) = (&spec[..open], &spec[close + 1..]);
    let (old, new) = spec[open + 1..close].split_once(" => ")?;
    let join = |middle: &str| normalise(&format!("{prefix}{middle}{suffix}"));
    Some((join(old), join(new)))
}

fn normalise(path: &str) -> String {
    let mut out = path.replace("//", "/");
    while out.starts_with('/') {
        out.remove(0);
    }
    out
}

/// Builds the aligned rows for one file from its two texts.
fn file_diff(path: &str, status: FileStatus, old: &str, new: &str) -> FileDiff {
    let diff = TextDiff::from_lines(old, new);
    let regions = coalesce(diff.ops().iter().filter_map(|op| {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        (tag != DiffTag::Equal).then(|| ChangeRegion {
            old_start: old_range.start,
            old_len: old_range.len(),
            new_start: new_range.start,
            new_len: new_range.len(),
        })
    }));

    let deletions: usize = regions.iter().map(|r| r.old_len).sum();
    let additions: usize = regions.iter().map(|r| r.new_len).sum();
    let left: Vec<String> = old.lines().map(str::to_owned).collect();
    let right: Vec<String> = new.lines().map(str::to_owned).collect();
    let (rows, hunks) = align(left.len(), right.len(), &regions);

    let mut file = FileDiff::summary(
        path,
        status,
        u32::try_from(additions).unwrap_or(u32::MAX),
        u32::try_from(deletions).unwrap_or(u32::MAX),
    );
    file.aligned_lines = rows;
    file.hunks = hunks;
    file.sides = FileSides { left, right };
    file
}

fn mentions_revision(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("revset") || lower.contains("revision")
}

fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("{JJ} exited with {}", output.status)
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lines_parse_by_status() {
        assert_eq!(
            parse_summary_line("M src/lib.rs"),
            Some(SummaryEntry { status: FileStatus::Modified, path: "src/lib.rs".into(), old_path: None })
        );
        assert_eq!(parse_summary_line("A docs/new file.md").unwrap().path, "docs/new file.md");
        assert_eq!(parse_summary_line("D gone.txt").unwrap().status, FileStatus::Deleted);
        assert_eq!(parse_summary_line("Working copy changes:"), None);
        assert_eq!(parse_summary_line("M "), None);
    }

    #[test]
    fn rename_braces_expand_to_full_paths() {
        let entry = parse_summary_line("R src/{old.rs => new.rs}").unwrap();
        assert_eq!(entry.status, FileStatus::Renamed);
        assert_eq!(entry.path, "src/new.rs");
        assert_eq!(entry.old_path.as_deref(), Some("src/old.rs"));

        assert_eq!(
            split_rename("{a => b}/mod.rs"),
            Some(("a/mod.rs".to_owned(), "b/mod.rs".to_owned()))
        );
        // Moving out of a directory leaves an empty side.
        assert_eq!(
            split_rename("src/{util => }/x.rs"),
            Some(("src/util/x.rs".to_owned(), "src/x.rs".to_owned()))
        );
        assert_eq!(split_rename("{ => lib}/a.rs"), Some(("a.rs".to_owned(), "lib/a.rs".to_owned())));
    }

    #[test]
    fn copy_keeps_its_source() {
        let entry = parse_summary_line("C {a.txt => b.txt}").unwrap();
        assert_eq!(entry.status, FileStatus::Added);
        assert_eq!(entry.path, "b.txt");
        assert_eq!(entry.old_path.as_deref(), Some("a.txt"));
    }

    #[test]
    fn revsets_map_to_jj_arguments() {
        let wc = Target::from_revset(&Revset::Staged);
        assert_eq!(wc, Target::from_revset(&Revset::Unstaged));
        assert_eq!(wc.diff_args(), ["-r", "@"]);
        assert_eq!(wc.old_rev(), "(@)-");
        assert_eq!(wc.new_rev(), "@");

        let range = Target::from_revset(&Revset::Range("main..@-".into()));
        assert_eq!(range.diff_args(), ["--from", "main", "--to", "@-"]);
        assert_eq!(range.old_rev(), "main");

        let open_ended = Target::from_revset(&Revset::Range("main..".into()));
        assert_eq!(open_ended.new_rev(), "@");
    }

    #[test]
    fn only_the_summary_snapshots_the_working_copy() {
        let wc = Target::from_revset(&Revset::Unstaged);
        assert_eq!(wc.summary_args(), ["diff", "--summary", "-r", "@"]);
        assert!(!wc.summary_args().contains(&"--ignore-working-copy"));

        let show = show_args("(@)-", "root-file:\"a.rs\"");
        assert!(show.contains(&"--ignore-working-copy"));
        assert_eq!(show[..2], ["file", "show"]);
    }

    #[test]
    fn replaced_lines_pair_up_across_sides() {
        let file = file_diff("a.txt", FileStatus::Modified, "a\nb\nc\n", "a\nB\nB2\nc\n");
        let pairs: Vec<_> = file.aligned_lines.iter().map(|r| (r.left, r.right)).collect();
        assert_eq!(
            pairs,
            [(Some(1), Some(1)), (Some(2), Some(2)), (None, Some(3)), (Some(3), Some(4))]
        );
        assert_eq!(file.hunks.len(), 1);
        assert_eq!(file.hunks[0].rows(), 1..3);
        assert_eq!((file.additions, file.deletions), (2, 1));
    }

    #[test]
    fn new_file_has_only_right_rows() {
        let file = file_diff("n.txt", FileStatus::Added, "", "x\ny\n");
        assert!(file.aligned_lines.iter().all(|r| r.left.is_none()));
        assert_eq!(file.row_count(), 2);
        assert_eq!(file.sides.right, ["x", "y"]);
    }

    #[test]
    fn identical_texts_have_no_hunks() {
        let file = file_diff("same.txt", FileStatus::Renamed, "a\nb\n", "a\nb\n");
        assert!(file.hunks.is_empty());
        assert_eq!(file.row_count(), 2);
    }

    #[test]
    fn revision_errors_are_detected() {
        assert!(mentions_revision("Error: Revision `nope` doesn't exist"));
        assert!(mentions_revision("Error: Failed to parse revset"));
        assert!(!mentions_revision("Error: There is no jj repo in \".\""));
    }
}
