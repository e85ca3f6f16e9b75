//! Diff provider backed by libgit2.
//!
//! git2::Repository is !Send, so the provider only keeps the work tree path
//! and opens the repository inside each fetch, on the worker thread.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use git2::{Delta, Diff, DiffDelta, DiffFindOptions, DiffOptions, Oid, Patch, Repository, Tree};
use tracing::debug;

use diffdeck_core::error::ProviderError;
use diffdeck_core::model::{FileDiff, FileSides, FileStatus, Revset};
use diffdeck_core::provider::{DiffProvider, DiffResult};
use diffdeck_core::vcs::VcsKind;

use crate::vcs::align::{align, ChangeRegion};

pub struct GitProvider {
    workdir: PathBuf,
}

impl GitProvider {
    /// Fails when `workdir` is not inside a git repository.
    pub fn open(workdir: &Path) -> Result<Self, ProviderError> {
        Repository::discover(workdir).map_err(|e| ProviderError::Unavailable(e.message().to_owned()))?;
        Ok(Self { workdir: workdir.to_path_buf() })
    }
}

impl DiffProvider for GitProvider {
    fn vcs_kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn fetch(&mut self, revset: &Revset) -> Result<DiffResult, ProviderError> {
        let repo = Repository::discover(&self.workdir)
            .map_err(|e| ProviderError::Unavailable(e.message().to_owned()))?;
        let (diff, new_side) = build_diff(&repo, revset)?;
        let files = collect_files(&repo, &diff, new_side)
            .map_err(|err| ProviderError::Unavailable(format!("{err:#}")))?;
        debug!(revset = %revset, files = files.len(), "git diff collected");
        Ok(DiffResult::from_files(files))
    }
}

/// Where the right-hand content of a delta lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NewSide {
    Odb,
    /// Work tree files are not in the object database; read them from disk.
    Workdir,
}

fn build_diff<'r>(repo: &'r Repository, revset: &Revset) -> Result<(Diff<'r>, NewSide), ProviderError> {
    let unavailable = |e: git2::Error| ProviderError::Unavailable(e.message().to_owned());

    let mut opts = DiffOptions::new();
    opts.context_lines(0).include_typechange(true);

    let (mut diff, side) = match revset {
        Revset::Unstaged => {
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .show_untracked_content(true);
            let diff = repo.diff_index_to_workdir(None, Some(&mut opts)).map_err(unavailable)?;
            (diff, NewSide::Workdir)
        }
        Revset::Staged => {
            // An unborn branch diffs the index against the empty tree.
            let head = repo.head().ok().and_then(|h| h.peel_to_tree().ok());
            let diff = repo
                .diff_tree_to_index(head.as_ref(), None, Some(&mut opts))
                .map_err(unavailable)?;
            (diff, NewSide::Odb)
        }
        Revset::Range(token) => match split_range(token) {
            Some((from, to)) => {
                let old = resolve_tree(repo, from, token)?;
                let new = resolve_tree(repo, to, token)?;
                let diff = repo
                    .diff_tree_to_tree(Some(&old), Some(&new), Some(&mut opts))
                    .map_err(unavailable)?;
                (diff, NewSide::Odb)
            }
            None => {
                let base = resolve_tree(repo, token, token)?;
                let diff = repo
                    .diff_tree_to_workdir_with_index(Some(&base), Some(&mut opts))
                    .map_err(unavailable)?;
                (diff, NewSide::Workdir)
            }
        },
    };

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find)).map_err(unavailable)?;
    Ok((diff, side))
}

/// Splits `a..b`. An empty side means HEAD, as on the git command line.
fn split_range(token: &str) -> Option<(&str, &str)> {
    fn or_head(rev: &str) -> &str {
        if rev.is_empty() {
            "HEAD"
        } else {
            rev
        }
    }
    let (from, to) = token.split_once("..")?;
    Some((or_head(from), or_head(to)))
}

fn resolve_tree<'r>(repo: &'r Repository, rev: &str, token: &str) -> Result<Tree<'r>, ProviderError> {
    if rev.starts_with('.') {
        return Err(ProviderError::UnsupportedRevset(token.to_owned()));
    }
    repo.revparse_single(rev)
        .and_then(|obj| obj.peel_to_tree())
        .map_err(|_| ProviderError::UnsupportedRevset(token.to_owned()))
}

fn collect_files(repo: &Repository, diff: &Diff<'_>, new_side: NewSide) -> anyhow::Result<Vec<FileDiff>> {
    let mut files = Vec::with_capacity(diff.deltas().len());
    for idx in 0..diff.deltas().len() {
        let Some(patch) = Patch::from_diff(diff, idx).context("building patch")? else {
            continue;
        };
        if let Some(file) = file_from_patch(repo, &patch, new_side)? {
            files.push(file);
        }
    }
    Ok(files)
}

fn file_from_patch(repo: &Repository, patch: &Patch<'_>, new_side: NewSide) -> anyhow::Result<Option<FileDiff>> {
    let delta = patch.delta();
    let status = match delta.status() {
        Delta::Added | Delta::Untracked => FileStatus::Added,
        Delta::Deleted => FileStatus::Deleted,
        Delta::Renamed => FileStatus::Renamed,
        Delta::Modified | Delta::Typechange | Delta::Copied | Delta::Conflicted => FileStatus::Modified,
        Delta::Unmodified | Delta::Ignored | Delta::Unreadable => return Ok(None),
    };
    let Some(path) = delta_path(&delta) else {
        return Ok(None);
    };

    let (_, additions, deletions) = patch.line_stats().context("counting lines")?;
    let mut file = FileDiff::summary(path, status, to_u32(additions), to_u32(deletions));
    if status == FileStatus::Renamed {
        file.old_path = delta.old_file().path().map(|p| p.to_string_lossy().into_owned());
    }

    if delta.flags().is_binary() {
        return Ok(Some(file));
    }

    let left = match status {
        FileStatus::Added => Vec::new(),
        _ => read_blob(repo, delta.old_file().id())?,
    };
    let right = match (status, new_side) {
        (FileStatus::Deleted, _) => Vec::new(),
        (_, NewSide::Workdir) => read_workdir(repo, &file.path)?,
        _ => read_blob(repo, delta.new_file().id())?,
    };
    let (Some(left), Some(right)) = (text_lines(&left), text_lines(&right)) else {
        return Ok(Some(file));
    };

    let mut regions = Vec::with_capacity(patch.num_hunks());
    for h in 0..patch.num_hunks() {
        let (hunk, _) = patch.hunk(h).context("reading hunk")?;
        regions.push(ChangeRegion::from_header(
            hunk.old_start(),
            hunk.old_lines(),
            hunk.new_start(),
            hunk.new_lines(),
        ));
    }
    let (rows, hunks) = align(left.len(), right.len(), &regions);
    file.aligned_lines = rows;
    file.hunks = hunks;
    file.sides = FileSides { left, right };
    Ok(Some(file))
}

fn delta_path(delta: &DiffDelta<'_>) -> Option<String> {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().into_owned())
}

fn read_blob(repo: &Repository, id: Oid) -> anyhow::Result<Vec<u8>> {
    if id.is_zero() {
        return Ok(Vec::new());
    }
    let blob = repo.find_blob(id).with_context(|| format!("reading blob {id}"))?;
    Ok(blob.content().to_vec())
}

fn read_workdir(repo: &Repository, path: &str) -> anyhow::Result<Vec<u8>> {
    let root = repo.workdir().context("repository has no work tree")?;
    let full = root.join(path);
    fs::read(&full).with_context(|| format!("reading {}", full.display()))
}

/// Splits text into lines. `None` for content with a NUL byte.
fn text_lines(bytes: &[u8]) -> Option<Vec<String>> {
    if bytes.contains(&0) {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).lines().map(str::to_owned).collect())
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index.add_all(["*"], git2::IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap();
    }

    fn repo_with(files: &[(&str, &str)]) -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        for (path, body) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, body).unwrap();
        }
        commit_all(&repo, "initial");
        (dir, repo)
    }

    fn fetch(dir: &TempDir, revset: Revset) -> Result<DiffResult, ProviderError> {
        GitProvider::open(dir.path()).unwrap().fetch(&revset)
    }

    fn files(result: DiffResult) -> Vec<FileDiff> {
        match result {
            DiffResult::Files(files) => files,
            DiffResult::Empty => Vec::new(),
        }
    }

    #[test]
    fn clean_tree_is_empty() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\n")]);
        assert_eq!(fetch(&dir, Revset::Unstaged).unwrap(), DiffResult::Empty);
        assert_eq!(fetch(&dir, Revset::Staged).unwrap(), DiffResult::Empty);
    }

    #[test]
    fn unstaged_edit_is_aligned_against_the_index() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\ntwo\nthree\n")]);
        fs::write(dir.path().join("a.txt"), "one\nTWO\nthree\nfour\n").unwrap();

        let files = files(fetch(&dir, Revset::Unstaged).unwrap());
        assert_eq!(files.len(), 1);
        let f = &files[0];
        assert_eq!(f.path, "a.txt");
        assert_eq!(f.status, FileStatus::Modified);
        assert_eq!((f.additions, f.deletions), (2, 1));
        let pairs: Vec<_> = f.aligned_lines.iter().map(|r| (r.left, r.right)).collect();
        assert_eq!(
            pairs,
            [(Some(1), Some(1)), (Some(2), Some(2)), (Some(3), Some(3)), (None, Some(4))]
        );
        assert_eq!(f.hunks.len(), 2);
        assert_eq!(f.sides.right[1], "TWO");
        assert_eq!(f.sides.left[1], "two");
    }

    #[test]
    fn untracked_file_shows_as_added() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\n")]);
        fs::create_dir_all(dir.path().join("new")).unwrap();
        fs::write(dir.path().join("new/b.txt"), "x\ny\n").unwrap();

        let files = files(fetch(&dir, Revset::Unstaged).unwrap());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "new/b.txt");
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(files[0].row_count(), 2);
        assert!(files[0].aligned_lines.iter().all(|r| r.left.is_none()));
    }

    #[test]
    fn staged_sees_only_the_index() {
        let (dir, repo) = repo_with(&[("a.txt", "one\n"), ("b.txt", "two\n")]);
        fs::write(dir.path().join("a.txt"), "uno\n").unwrap();
        fs::write(dir.path().join("b.txt"), "dos\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        index.write().unwrap();

        let staged = files(fetch(&dir, Revset::Staged).unwrap());
        assert_eq!(staged.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(), ["a.txt"]);
        assert_eq!(staged[0].sides.right, ["uno"]);

        let unstaged = files(fetch(&dir, Revset::Unstaged).unwrap());
        assert_eq!(unstaged.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(), ["b.txt"]);
    }

    #[test]
    fn commit_range_diffs_two_trees() {
        let (dir, repo) = repo_with(&[("a.txt", "one\n")]);
        fs::remove_file(dir.path().join("a.txt")).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(Path::new("a.txt")).unwrap();
        index.write().unwrap();
        commit_all(&repo, "remove");

        let files = files(fetch(&dir, Revset::Range("HEAD~1..".into())).unwrap());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, FileStatus::Deleted);
        assert_eq!(files[0].deletions, 1);
        assert_eq!(files[0].aligned_lines[0].right, None);
    }

    #[test]
    fn single_revision_diffs_against_the_work_tree() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\n")]);
        fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();

        let files = files(fetch(&dir, Revset::Range("HEAD".into())).unwrap());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].additions, 1);
        assert_eq!(files[0].sides.right, ["one", "two"]);
    }

    #[test]
    fn binary_file_has_summary_only() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\n")]);
        fs::write(dir.path().join("blob.bin"), [0u8, 1, 2, 0, 3]).unwrap();

        let files = files(fetch(&dir, Revset::Unstaged).unwrap());
        assert_eq!(files.len(), 1);
        assert!(files[0].aligned_lines.is_empty());
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn unknown_revision_is_unsupported() {
        let (dir, _repo) = repo_with(&[("a.txt", "one\n")]);
        assert_eq!(
            fetch(&dir, Revset::Range("no-such-ref".into())),
            Err(ProviderError::UnsupportedRevset("no-such-ref".into()))
        );
        assert_eq!(
            fetch(&dir, Revset::Range("HEAD...HEAD".into())),
            Err(ProviderError::UnsupportedRevset("HEAD...HEAD".into()))
        );
    }

    #[test]
    fn open_outside_a_repository_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(GitProvider::open(dir.path()), Err(ProviderError::Unavailable(_))));
    }
}
