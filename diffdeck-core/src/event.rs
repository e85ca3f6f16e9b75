//! Events produced off the primary context.
//!
//! The provider worker and the change watcher never touch session state.
//! They post a `SessionEvent` instead, and the owner of the controller feeds
//! it to [`crate::controller::SessionController::handle_event`] on its own
//! thread.

use crate::error::ProviderError;
use crate::provider::DiffResult;
use crate::session::SessionId;

#[derive(Debug)]
pub enum SessionEvent {
    /// A provider fetch finished. `generation` identifies the fetch within
    /// its session.
    FetchCompleted {
        session: SessionId,
        generation: u64,
        result: Result<DiffResult, ProviderError>,
    },
    /// The VCS state file changed and the debounce window elapsed.
    WatchFired { session: SessionId },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SessionEvent::FetchCompleted { session, .. } | SessionEvent::WatchFired { session } => {
                *session
            }
        }
    }
}
