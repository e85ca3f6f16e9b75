//! Fakes shared by the integration tests: a provider that replays scripted
//! results and a host that records every call it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diffdeck_core::config::SessionConfig;
use diffdeck_core::controller::{RefreshOutcome, SessionController};
use diffdeck_core::error::{ControllerError, HostError, ProviderError};
use diffdeck_core::event::SessionEvent;
use diffdeck_core::host::{HostBridge, Notice, SurfaceId};
use diffdeck_core::model::{AlignedLine, FileDiff, FileStatus, HunkSpan, Revset};
use diffdeck_core::provider::{DiffProvider, DiffResult, ProviderFactory};
use diffdeck_core::session::Selection;
use diffdeck_core::vcs::VcsKind;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Results handed out by [`ScriptedProvider`], front first. The last entry
/// repeats once the others are used up.
#[derive(Clone, Default)]
pub struct Script {
    responses: Arc<Mutex<VecDeque<Result<DiffResult, ProviderError>>>>,
    calls: Arc<AtomicUsize>,
    revsets: Arc<Mutex<Vec<Revset>>>,
}

impl Script {
    pub fn new(responses: Vec<Result<DiffResult, ProviderError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            ..Self::default()
        }
    }

    pub fn files(files: Vec<FileDiff>) -> Self {
        Self::new(vec![Ok(DiffResult::Files(files))])
    }

    pub fn push(&self, response: Result<DiffResult, ProviderError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Replaces everything still queued with `response`.
    pub fn set(&self, response: Result<DiffResult, ProviderError>) {
        let mut queue = self.responses.lock().unwrap();
        queue.clear();
        queue.push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn revsets(&self) -> Vec<Revset> {
        self.revsets.lock().unwrap().clone()
    }

    fn next(&self) -> Result<DiffResult, ProviderError> {
        let mut queue = self.responses.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or(Ok(DiffResult::Empty))
        }
    }
}

pub struct ScriptedProvider {
    script: Script,
}

impl DiffProvider for ScriptedProvider {
    fn vcs_kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn fetch(&mut self, revset: &Revset) -> Result<DiffResult, ProviderError> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script.revsets.lock().unwrap().push(revset.clone());
        self.script.next()
    }
}

pub struct ScriptedFactory {
    pub script: Script,
    pub binds: Arc<AtomicUsize>,
    pub bind_error: Option<ProviderError>,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self { script, binds: Arc::default(), bind_error: None }
    }
}

impl ProviderFactory for ScriptedFactory {
    fn bind(&self, _vcs: VcsKind) -> Result<Box<dyn DiffProvider>, ProviderError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.bind_error {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedProvider { script: self.script.clone() }))
    }
}

/// Host that owns an optional pre-existing base surface and records calls.
#[derive(Default)]
pub struct RecordingHost {
    next_id: u64,
    pub live: Vec<SurfaceId>,
    pub destroyed: Vec<SurfaceId>,
    pub restored: Vec<SurfaceId>,
    pub file_lists: Vec<Vec<String>>,
    pub renders: Vec<(String, Selection)>,
    pub highlights: Vec<usize>,
    pub notices: Vec<Notice>,
    pub fail_destroy: bool,
}

impl RecordingHost {
    /// A host with one base surface that sessions never own.
    pub fn new() -> Self {
        let mut host = Self::bare();
        let base = host.alloc();
        host.live.push(base);
        host
    }

    /// A host with no surfaces of its own.
    pub fn bare() -> Self {
        Self { next_id: 1, ..Self::default() }
    }

    fn alloc(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Simulates the user closing a pane behind the controller's back.
    pub fn invalidate(&mut self, id: SurfaceId) {
        self.live.retain(|&s| s != id);
    }

    pub fn last_rendered_path(&self) -> Option<&str> {
        self.renders.last().map(|(path, _)| path.as_str())
    }
}

impl HostBridge for RecordingHost {
    fn create_surfaces(&mut self) -> Vec<SurfaceId> {
        let ids: Vec<SurfaceId> = (0..3).map(|_| self.alloc()).collect();
        self.live.extend(&ids);
        ids
    }

    fn surface_valid(&self, id: SurfaceId) -> bool {
        self.live.contains(&id)
    }

    fn is_only_surface(&self, id: SurfaceId) -> bool {
        self.live == [id]
    }

    fn restore_prior(&mut self, id: SurfaceId) {
        self.restored.push(id);
    }

    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), HostError> {
        if self.fail_destroy {
            return Err(HostError::Rejected("busy".into()));
        }
        self.live.retain(|&s| s != id);
        self.destroyed.push(id);
        Ok(())
    }

    fn show_file_list(&mut self, files: &[FileDiff], order: &[usize]) {
        self.file_lists.push(order.iter().map(|&i| files[i].path.clone()).collect());
    }

    fn render(&mut self, file: &FileDiff, selection: &Selection) {
        self.renders.push((file.path.clone(), *selection));
    }

    fn highlight_selection(&mut self, index: usize) {
        self.highlights.push(index);
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// A modified file with `rows` identical rows and the given hunk spans.
pub fn file(path: &str, additions: u32, rows: u32, hunks: &[(usize, usize)]) -> FileDiff {
    let mut f = FileDiff::summary(path, FileStatus::Modified, additions, 0);
    f.aligned_lines = (1..=rows).map(|n| AlignedLine::new(Some(n), Some(n))).collect();
    f.hunks = hunks.iter().map(|&(s, e)| HunkSpan::new(s, e)).collect();
    f
}

pub fn quiet_config() -> SessionConfig {
    SessionConfig { watch_enabled: false, ..SessionConfig::default() }
}

pub struct Harness {
    pub controller: SessionController<RecordingHost>,
    pub events: UnboundedReceiver<SessionEvent>,
    pub script: Script,
    pub binds: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new(script: Script) -> Self {
        Self::with_host(script, RecordingHost::new(), Path::new("/nonexistent"))
    }

    pub fn with_host(script: Script, host: RecordingHost, workdir: &Path) -> Self {
        let factory = ScriptedFactory::new(script.clone());
        let binds = Arc::clone(&factory.binds);
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = SessionController::new(host, Box::new(factory), VcsKind::Git, workdir, tx);
        Self { controller, events: rx, script, binds }
    }

    /// Waits for the next session event and feeds it to the controller.
    pub async fn pump(&mut self) -> Result<RefreshOutcome, ControllerError> {
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("event channel closed");
        self.controller.handle_event(event)
    }

    /// Asserts that no further event arrives within a short window.
    pub async fn assert_idle(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await;
        assert!(next.is_err(), "unexpected event: {next:?}");
    }

    pub async fn open(&mut self, config: SessionConfig) -> RefreshOutcome {
        self.controller.open(Revset::Unstaged, config).unwrap();
        self.pump().await.unwrap()
    }
}
