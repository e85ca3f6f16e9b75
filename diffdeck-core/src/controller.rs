//! The session controller: one diff session per host.
//!
//! `SessionController` is driven from a single thread. Requests come in as
//! method calls ([`open`](SessionController::open),
//! [`dispatch`](SessionController::dispatch), [`close`](SessionController::close));
//! provider results and watcher wake-ups come in as [`SessionEvent`]s through
//! [`handle_event`](SessionController::handle_event). Nothing else mutates the
//! session, so no locking is involved.
//!
//! ```text
//!   Closed --open--> Opening --files--> Open --close/empty--> Closing --> Closed
//!                       |                 ^ |
//!                       +--empty/error----+-+--> Closed
//! ```

use std::mem;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{ControllerError, ProviderError};
use crate::event::SessionEvent;
use crate::host::{CommandOutcome, HostBridge, HostCommand, Notice, SurfaceId};
use crate::model::{Location, Revset, Side};
use crate::navigation;
use crate::provider::{DiffResult, FetchRequest, ProviderFactory, ProviderWorker};
use crate::reconcile::{self, Reconciliation};
use crate::refresh::{Admit, RefreshGate};
use crate::session::{Lifecycle, SessionId, SessionState};
use crate::vcs::VcsKind;
use crate::watcher::ChangeWatcher;

/// Why a refresh was requested. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Open,
    Manual,
    Watcher,
    Save,
    /// Follow-up of a request that overlapped the previous fetch.
    Queued,
}

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A fetch was sent to the provider.
    Started,
    /// A fetch is already running; one follow-up will run after it.
    Queued,
    /// A fetch is already running and the overlap policy discards extras.
    Dropped,
    /// No session to refresh.
    NotOpen,
}

/// Effect of one [`SessionEvent`] on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The first result arrived; surfaces exist and `selected` is shown.
    Opened { selected: usize },
    /// The file list changed and was redrawn.
    Rerendered { selected: usize },
    /// Same fingerprint as before. Nothing was redrawn.
    Unchanged,
    /// The result was empty and the session has been closed.
    Closed,
    /// The event belongs to a session or fetch that no longer exists.
    Stale,
    /// A watcher wake-up was turned into a refresh request.
    RefreshRequested(Admission),
}

pub struct SessionController<H: HostBridge> {
    host: H,
    factory: Box<dyn ProviderFactory>,
    vcs: VcsKind,
    workdir: PathBuf,
    config: SessionConfig,
    events: UnboundedSender<SessionEvent>,
    lifecycle: Lifecycle,
    session: SessionState,
    surfaces: Vec<SurfaceId>,
    worker: Option<ProviderWorker>,
    gate: RefreshGate,
    watcher: ChangeWatcher,
}

impl<H: HostBridge> SessionController<H> {
    /// Creates a closed controller for the repository at `workdir`.
    ///
    /// Events produced on behalf of the session are sent to `events`; the
    /// caller feeds them back through [`handle_event`](Self::handle_event).
    pub fn new(
        host: H,
        factory: Box<dyn ProviderFactory>,
        vcs: VcsKind,
        workdir: impl Into<PathBuf>,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            host,
            factory,
            vcs,
            workdir: workdir.into(),
            config: SessionConfig::default(),
            events,
            lifecycle: Lifecycle::Closed,
            session: SessionState::default(),
            surfaces: Vec::new(),
            worker: None,
            gate: RefreshGate::default(),
            watcher: ChangeWatcher::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn vcs(&self) -> VcsKind {
        self.vcs
    }

    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    pub fn watcher_active(&self) -> bool {
        self.watcher.is_active()
    }

    /// Opens a session on `revset`, or retargets the existing one.
    ///
    /// From `Closed` this binds a provider, mints a new session id and issues
    /// the first fetch; the session becomes `Open` when its result arrives.
    /// With a session already opening or open, the revset is replaced and a
    /// fresh fetch is issued instead of creating a second session. A fetch
    /// still running for the old revset is abandoned whatever the overlap
    /// policy; its answer arrives stale. The watcher restarts if
    /// `watch_enabled` or its timing changed.
    ///
    /// # Errors
    ///
    /// Binding the provider or starting its worker failed. The controller
    /// stays `Closed`.
    pub fn open(&mut self, revset: Revset, config: SessionConfig) -> Result<Admission, ControllerError> {
        match self.lifecycle {
            Lifecycle::Opening | Lifecycle::Open => {
                debug!(session = %self.session.id(), %revset, "open on live session; retargeting");
                let rewatch = self.lifecycle == Lifecycle::Open
                    && (config.watch_enabled != self.config.watch_enabled
                        || config.timing() != self.config.timing());
                self.session.set_revset(revset);
                self.gate.set_policy(config.overlap_policy);
                self.config = config;
                if rewatch {
                    self.watcher.stop();
                    self.start_watcher();
                }
                self.gate.reset();
                self.request_refresh(RefreshTrigger::Manual)
            }
            Lifecycle::Closing => Ok(Admission::NotOpen),
            Lifecycle::Closed => {
                let provider = self.factory.bind(self.vcs)?;
                let worker =
                    ProviderWorker::spawn(provider, self.events.clone()).map_err(ControllerError::Worker)?;

                let id = SessionId::new();
                info!(session = %id, vcs = %self.vcs, %revset, "opening diff session");
                self.worker = Some(worker);
                self.gate = RefreshGate::new(config.overlap_policy);
                self.config = config;
                self.session = SessionState::new(id, revset);
                self.lifecycle = Lifecycle::Opening;

                let admission = self.request_refresh(RefreshTrigger::Open);
                if admission.is_err() {
                    self.close();
                }
                admission
            }
        }
    }

    /// Asks for a fetch of the current revset, subject to single-flight.
    ///
    /// # Errors
    ///
    /// The provider worker is gone. The gate is cleared so a later request
    /// can try again.
    pub fn request_refresh(&mut self, trigger: RefreshTrigger) -> Result<Admission, ControllerError> {
        if !matches!(self.lifecycle, Lifecycle::Opening | Lifecycle::Open) {
            return Ok(Admission::NotOpen);
        }
        let Some(worker) = self.worker.as_ref() else {
            return Ok(Admission::NotOpen);
        };

        match self.gate.admit() {
            Admit::Begin(generation) => {
                debug!(session = %self.session.id(), generation, ?trigger, "dispatching fetch");
                let request = FetchRequest {
                    session: self.session.id(),
                    generation,
                    revset: self.session.revset().clone(),
                };
                if let Err(err) = worker.submit(request) {
                    error!(session = %self.session.id(), "failed to reach provider worker: {err}");
                    self.gate.reset();
                    return Err(err.into());
                }
                Ok(Admission::Started)
            }
            Admit::Queued => {
                debug!(session = %self.session.id(), ?trigger, "fetch in flight; refresh queued");
                Ok(Admission::Queued)
            }
            Admit::Dropped => {
                warn!(session = %self.session.id(), ?trigger, "fetch in flight; refresh dropped");
                Ok(Admission::Dropped)
            }
        }
    }

    /// Applies an event produced by the provider worker or the watcher.
    ///
    /// # Errors
    ///
    /// The provider failed. While opening, the session is torn down first;
    /// an open session keeps its current files and selection.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<RefreshOutcome, ControllerError> {
        if self.lifecycle == Lifecycle::Closed || event.session() != self.session.id() {
            debug!(session = %event.session(), "dropping event for inactive session");
            return Ok(RefreshOutcome::Stale);
        }

        match event {
            SessionEvent::WatchFired { .. } => {
                if self.lifecycle != Lifecycle::Open {
                    return Ok(RefreshOutcome::Stale);
                }
                debug!(session = %self.session.id(), "state file changed");
                self.request_refresh(RefreshTrigger::Watcher)
                    .map(RefreshOutcome::RefreshRequested)
            }
            SessionEvent::FetchCompleted { generation, result, .. } => {
                let Some(follow_up) = self.gate.complete(generation) else {
                    debug!(session = %self.session.id(), generation, "dropping superseded fetch");
                    return Ok(RefreshOutcome::Stale);
                };
                let outcome = match result {
                    Ok(result) if self.lifecycle == Lifecycle::Opening => Ok(self.finish_open(result)),
                    Ok(result) => Ok(self.apply_refresh(result)),
                    Err(err) => Err(self.fetch_failed(err)),
                };
                if follow_up && self.lifecycle == Lifecycle::Open {
                    self.request_refresh(RefreshTrigger::Queued)?;
                }
                outcome
            }
        }
    }

    fn fetch_failed(&mut self, err: ProviderError) -> ControllerError {
        error!(session = %self.session.id(), "diff provider failed: {err}");
        if self.lifecycle == Lifecycle::Opening {
            self.close();
        }
        ControllerError::ProviderUnavailable(err)
    }

    fn finish_open(&mut self, result: DiffResult) -> RefreshOutcome {
        let files = match result {
            DiffResult::Files(files) if !files.is_empty() => files,
            _ => {
                info!(session = %self.session.id(), "nothing to show");
                self.host.notify(Notice::NoChanges);
                self.close();
                return RefreshOutcome::Closed;
            }
        };

        self.surfaces = self.host.create_surfaces();
        let selected = reconcile::populate(&mut self.session, files).unwrap_or_default();
        self.host.show_file_list(self.session.files(), self.session.display_order());
        self.lifecycle = Lifecycle::Open;
        info!(
            session = %self.session.id(),
            files = self.session.len(),
            fingerprint = ?self.session.fingerprint().map(ToString::to_string),
            "diff session open"
        );
        self.start_watcher();
        self.render_current();
        RefreshOutcome::Opened { selected }
    }

    fn apply_refresh(&mut self, result: DiffResult) -> RefreshOutcome {
        match reconcile::reconcile(&mut self.session, result) {
            Reconciliation::Emptied => {
                info!(session = %self.session.id(), "changes are gone; closing");
                self.host.notify(Notice::NoChanges);
                self.close();
                RefreshOutcome::Closed
            }
            Reconciliation::Unchanged => {
                debug!(session = %self.session.id(), "fingerprint unchanged");
                RefreshOutcome::Unchanged
            }
            Reconciliation::Changed { selected, preserved } => {
                debug!(session = %self.session.id(), selected, preserved, "file list changed");
                self.host.show_file_list(self.session.files(), self.session.display_order());
                self.render_current();
                RefreshOutcome::Rerendered { selected }
            }
        }
    }

    fn start_watcher(&mut self) {
        if !self.config.watch_enabled {
            debug!("auto-refresh disabled by config");
            return;
        }
        let events = self.events.clone();
        let session = self.session.id();
        let started = self.watcher.start_for_repo(&self.workdir, self.vcs, self.config.timing(), move || {
            // The receiver only goes away when the host is shutting down.
            let _ = events.send(SessionEvent::WatchFired { session });
        });
        match started {
            Ok(path) => debug!(path = %path.display(), "watching VCS state"),
            Err(err) => {
                warn!("auto-refresh unavailable: {err}");
                self.host.notify(Notice::WatchDisabled { reason: err.to_string() });
            }
        }
    }

    fn render_current(&mut self) {
        let Some(selection) = self.session.selection() else {
            return;
        };
        if let Some(file) = self.session.files().get(selection.index) {
            self.host.render(file, &selection);
            self.host.highlight_selection(selection.index);
        }
    }

    /// Executes a user command against the open session.
    pub fn dispatch(&mut self, command: HostCommand) -> CommandOutcome {
        if command == HostCommand::Close {
            if self.lifecycle == Lifecycle::Closed {
                return CommandOutcome::Ignored;
            }
            self.close();
            return CommandOutcome::Closed;
        }
        if self.lifecycle != Lifecycle::Open {
            return CommandOutcome::Ignored;
        }

        let moved = match command {
            HostCommand::NextFile => self.step_file(navigation::next_in_display_order),
            HostCommand::PrevFile => self.step_file(navigation::prev_in_display_order),
            HostCommand::NextHunk => {
                navigation::next_hunk(&mut self.session)
                    || (self.config.wrap_hunks && navigation::wrap_next_hunk(&mut self.session).is_some())
            }
            HostCommand::PrevHunk => {
                navigation::prev_hunk(&mut self.session)
                    || (self.config.wrap_hunks && navigation::wrap_prev_hunk(&mut self.session).is_some())
            }
            HostCommand::SelectFile(index) => self.session.select(index),
            HostCommand::SetRow(row) => {
                return if self.session.set_cursor_row(row) {
                    CommandOutcome::Handled
                } else {
                    CommandOutcome::Ignored
                };
            }
            HostCommand::GotoLine { side, row, col } => return self.goto_line(side, row, col),
            HostCommand::Refresh => return self.refresh_command(RefreshTrigger::Manual),
            HostCommand::Saved if self.config.refresh_on_save => {
                return self.refresh_command(RefreshTrigger::Save);
            }
            HostCommand::Saved | HostCommand::Close => false,
        };

        if moved {
            self.render_current();
            CommandOutcome::Handled
        } else {
            CommandOutcome::Ignored
        }
    }

    fn step_file(&mut self, step: fn(&[usize], usize) -> Option<usize>) -> bool {
        let next = self
            .session
            .current()
            .and_then(|current| step(self.session.display_order(), current));
        match next {
            Some(index) => self.session.select(index),
            None => false,
        }
    }

    fn goto_line(&mut self, side: Side, row: usize, col: u32) -> CommandOutcome {
        let Some(file) = self.session.current_file() else {
            return CommandOutcome::Ignored;
        };
        let Some((mapped_row, line)) = navigation::nearest_mapped_row(file, row, side) else {
            return CommandOutcome::Ignored;
        };
        let location = Location {
            side,
            path: file.path_for(side).to_string(),
            line,
            col,
        };
        self.session.set_cursor_row(mapped_row);
        debug!(%location, "goto line");
        CommandOutcome::Goto(location)
    }

    fn refresh_command(&mut self, trigger: RefreshTrigger) -> CommandOutcome {
        match self.request_refresh(trigger) {
            Ok(Admission::Started | Admission::Queued) => CommandOutcome::Handled,
            Ok(Admission::Dropped | Admission::NotOpen) => CommandOutcome::Ignored,
            Err(err) => {
                error!("refresh failed: {err}");
                CommandOutcome::Ignored
            }
        }
    }

    /// Tears the session down. Safe to call in any state and more than once.
    ///
    /// Surfaces are released best-effort: ones the host no longer knows are
    /// skipped, the host's last surface is restored rather than destroyed,
    /// and destroy failures are logged.
    pub fn close(&mut self) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }
        let id = self.session.id();
        debug!(session = %id, from = ?self.lifecycle, "closing");
        self.lifecycle = Lifecycle::Closing;
        self.watcher.stop();

        for surface in mem::take(&mut self.surfaces) {
            if !self.host.surface_valid(surface) {
                debug!(%surface, "surface already gone");
                continue;
            }
            if self.host.is_only_surface(surface) {
                self.host.restore_prior(surface);
            } else if let Err(err) = self.host.destroy_surface(surface) {
                warn!(%surface, "failed to release surface: {err}");
            }
        }

        self.worker = None;
        self.gate.reset();
        self.session = SessionState::default();
        self.lifecycle = Lifecycle::Closed;
        info!(session = %id, "diff session closed");
    }
}
