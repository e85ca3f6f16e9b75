//! Diff providers for the VCS backends the viewer supports.

pub mod align;
pub mod git;
pub mod jj;

use std::path::{Path, PathBuf};

use tracing::info;

use diffdeck_core::error::ProviderError;
use diffdeck_core::provider::{DiffProvider, ProviderFactory};
use diffdeck_core::vcs::VcsKind;

use self::git::GitProvider;
use self::jj::JjProvider;

/// Binds the provider for a detected repository rooted at `workdir`.
pub struct VcsProviderFactory {
    workdir: PathBuf,
}

impl VcsProviderFactory {
    pub fn new(workdir: &Path) -> Self {
        Self { workdir: workdir.to_path_buf() }
    }
}

impl ProviderFactory for VcsProviderFactory {
    fn bind(&self, vcs: VcsKind) -> Result<Box<dyn DiffProvider>, ProviderError> {
        info!(%vcs, workdir = %self.workdir.display(), "binding diff provider");
        match vcs {
            VcsKind::Git => Ok(Box::new(GitProvider::open(&self.workdir)?)),
            VcsKind::Jj => Ok(Box::new(JjProvider::open(&self.workdir)?)),
        }
    }
}
