//! Diff providers and the background thread that calls them.
//!
//! A provider is bound once per session open through a [`ProviderFactory`]
//! and then moved onto a dedicated worker thread. The primary context sends
//! [`FetchRequest`]s over a crossbeam channel; the worker answers each with a
//! [`SessionEvent::FetchCompleted`] on the tokio channel the controller's
//! owner listens on. Dropping the [`ProviderWorker`] closes the request
//! channel and the thread exits after its current fetch, without anyone
//! waiting for it.

use std::io;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::event::SessionEvent;
use crate::model::{FileDiff, Revset};
use crate::session::SessionId;
use crate::vcs::VcsKind;

/// What a provider returns for one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
    Files(Vec<FileDiff>),
    /// The selector resolves to no changes at all.
    Empty,
}

impl DiffResult {
    /// Normalises an empty file list to [`DiffResult::Empty`].
    pub fn from_files(files: Vec<FileDiff>) -> Self {
        if files.is_empty() {
            DiffResult::Empty
        } else {
            DiffResult::Files(files)
        }
    }
}

/// A diff engine for one VCS kind.
///
/// Implementations must be safe to call repeatedly, must give the same answer
/// for the same VCS state, and must never modify that state.
pub trait DiffProvider: Send {
    fn vcs_kind(&self) -> VcsKind;

    fn fetch(&mut self, revset: &Revset) -> Result<DiffResult, ProviderError>;
}

/// Binds the provider implementation for a VCS kind. Called once per open.
pub trait ProviderFactory {
    fn bind(&self, vcs: VcsKind) -> Result<Box<dyn DiffProvider>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub session: SessionId,
    pub generation: u64,
    pub revset: Revset,
}

/// Handle to the provider thread of one session.
pub struct ProviderWorker {
    tx: Sender<FetchRequest>,
}

impl ProviderWorker {
    /// Moves `provider` onto a new thread and starts serving requests.
    pub fn spawn(
        provider: Box<dyn DiffProvider>,
        events: UnboundedSender<SessionEvent>,
    ) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name(format!("diffdeck-{}", provider.vcs_kind()))
            .spawn(move || worker_loop(provider, rx, events))?;
        Ok(Self { tx })
    }

    pub fn submit(&self, request: FetchRequest) -> Result<(), ProviderError> {
        self.tx
            .send(request)
            .map_err(|_| ProviderError::Unavailable("provider worker has exited".into()))
    }
}

fn worker_loop(
    mut provider: Box<dyn DiffProvider>,
    rx: Receiver<FetchRequest>,
    events: UnboundedSender<SessionEvent>,
) {
    for request in rx {
        debug!(
            session = %request.session,
            generation = request.generation,
            revset = %request.revset,
            "fetching diff"
        );
        let result = provider.fetch(&request.revset);
        let event = SessionEvent::FetchCompleted {
            session: request.session,
            generation: request.generation,
            result,
        };
        if events.send(event).is_err() {
            warn!("session event channel closed; provider worker exiting");
            break;
        }
    }
}
