//! Repository discovery and the VCS state file the watcher polls.
//!
//! Git keeps its mutable staging state in `<git dir>/index`; jj records each
//! new operation under `.jj/repo/op_heads/heads`. Either one changes whenever
//! the diff a session shows could have changed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;

use crate::error::WatchError;

const JJ_DIR: &str = ".jj";
const GIT_DIR: &str = ".git";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Jj,
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => f.write_str("git"),
            VcsKind::Jj => f.write_str("jj"),
        }
    }
}

/// A detected working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRoot {
    pub kind: VcsKind,
    pub workdir: PathBuf,
}

/// Finds the nearest ancestor of `start` holding a repository.
///
/// A directory with both `.jj` and `.git` (a colocated jj repo) is treated as
/// jj.
pub fn detect(start: &Path) -> Option<RepoRoot> {
    start.ancestors().find_map(|dir| {
        if dir.join(JJ_DIR).is_dir() {
            Some(RepoRoot { kind: VcsKind::Jj, workdir: dir.to_path_buf() })
        } else if dir.join(GIT_DIR).exists() {
            Some(RepoRoot { kind: VcsKind::Git, workdir: dir.to_path_buf() })
        } else {
            None
        }
    })
}

/// Resolves the state file watched for `kind`, starting from `workdir`.
///
/// # Errors
///
/// `RootNotFound` when no repository of that kind encloses `workdir`;
/// `StateFileMissing` when the repository exists but the file does not (for
/// example a git repository that has never staged anything).
pub fn resolve_state_file(workdir: &Path, kind: VcsKind) -> Result<PathBuf, WatchError> {
    let path = match kind {
        VcsKind::Git => {
            let repo = Repository::discover(workdir).map_err(|_| WatchError::RootNotFound {
                vcs: "git",
                path: workdir.to_path_buf(),
            })?;
            repo.path().join("index")
        }
        VcsKind::Jj => jj_repo_dir(workdir)?.join("op_heads").join("heads"),
    };
    if !path.exists() {
        return Err(WatchError::StateFileMissing(path));
    }
    Ok(path)
}

/// The `.jj/repo` directory for `workdir`. Secondary workspaces store a
/// file there holding the path of the shared repo instead.
fn jj_repo_dir(workdir: &Path) -> Result<PathBuf, WatchError> {
    let jj_dir = workdir
        .ancestors()
        .map(|dir| dir.join(JJ_DIR))
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| WatchError::RootNotFound { vcs: "jj", path: workdir.to_path_buf() })?;

    let repo = jj_dir.join("repo");
    if repo.is_file() {
        let pointer = fs::read_to_string(&repo)?;
        let target = PathBuf::from(pointer.trim());
        return Ok(if target.is_absolute() { target } else { jj_dir.join(target) });
    }
    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_git_from_nested_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let root = detect(&nested).unwrap();
        assert_eq!(root.kind, VcsKind::Git);
        assert_eq!(root.workdir, dir.path());
    }

    #[test]
    fn colocated_repo_is_jj() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join(".jj")).unwrap();
        assert_eq!(detect(dir.path()).unwrap().kind, VcsKind::Jj);
    }

    #[test]
    fn git_index_resolves_once_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            resolve_state_file(dir.path(), VcsKind::Git),
            Err(WatchError::StateFileMissing(_))
        ));

        repo.index().unwrap().write().unwrap();
        let path = resolve_state_file(dir.path(), VcsKind::Git).unwrap();
        assert!(path.ends_with("index"));
    }

    #[test]
    fn missing_repo_reports_root_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            resolve_state_file(dir.path(), VcsKind::Jj),
            Err(WatchError::RootNotFound { vcs: "jj", .. })
        ));
    }

    #[test]
    fn jj_workspace_pointer_is_followed() {
        let main = tempfile::TempDir::new().unwrap();
        let heads = main.path().join(".jj").join("repo").join("op_heads").join("heads");
        fs::create_dir_all(&heads).unwrap();

        let secondary = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(secondary.path().join(".jj")).unwrap();
        let shared = main.path().join(".jj").join("repo");
        fs::write(secondary.path().join(".jj").join("repo"), shared.to_string_lossy().as_bytes())
            .unwrap();

        let path = resolve_state_file(secondary.path(), VcsKind::Jj).unwrap();
        assert_eq!(path, heads);
    }
}
