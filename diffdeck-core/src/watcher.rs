//! Polling change watcher with a resettable debounce.
//!
//! The watcher samples a [`StateProbe`] every poll interval. A changed
//! signature does not fire the callback; it (re)arms a single debounce
//! deadline. The callback runs once the deadline passes with no further
//! change, so a burst of writes (git rewrites its index through a lock file
//! and a rename) produces one refresh.
//!
//! Polling is used instead of filesystem notifications because the watched
//! file is replaced rather than modified in place, which several notify
//! backends report inconsistently.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::WatchError;
use crate::vcs::{self, VcsKind};

/// Observable state of the watched resource. Any difference counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Source of [`Signature`]s.
pub trait StateProbe: Send + 'static {
    fn probe(&mut self) -> Result<Signature, WatchError>;
}

/// Reads modification time and size of one file.
#[derive(Debug, Clone)]
pub struct StateFileProbe {
    path: PathBuf,
}

impl StateFileProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateProbe for StateFileProbe {
    fn probe(&mut self) -> Result<Signature, WatchError> {
        let meta = std::fs::metadata(&self.path)?;
        Ok(Signature {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTiming {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            debounce: Duration::from_millis(100),
        }
    }
}

/// A single resettable deadline.
///
/// Every change moves the deadline to `now + delay`; there is never more than
/// one pending.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Records a change at `now`, cancelling any earlier deadline.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once when `now` has reached the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

struct ActiveWatch {
    task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
}

/// Owns at most one running watch task.
#[derive(Default)]
pub struct ChangeWatcher {
    active: Option<ActiveWatch>,
}

impl ChangeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Resolves the state file for `kind` under `workdir` and starts watching it.
    ///
    /// # Errors
    ///
    /// Returns the resolution error and installs nothing. Any previously
    /// running watch is stopped either way.
    pub fn start_for_repo<F>(
        &mut self,
        workdir: &Path,
        kind: VcsKind,
        timing: WatchTiming,
        on_change: F,
    ) -> Result<PathBuf, WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop();
        let path = vcs::resolve_state_file(workdir, kind)?;
        self.start(StateFileProbe::new(path.clone()), timing, on_change)?;
        Ok(path)
    }

    /// Starts polling `probe` on the current tokio runtime.
    ///
    /// The first sample becomes the baseline; it never fires the callback.
    pub fn start<P, F>(&mut self, mut probe: P, timing: WatchTiming, on_change: F) -> Result<(), WatchError>
    where
        P: StateProbe,
        F: Fn() + Send + Sync + 'static,
    {
        self.stop();
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let baseline = probe.probe()?;
        let alive = Arc::new(AtomicBool::new(true));
        let task = runtime.spawn(run_watch(probe, baseline, timing, Arc::clone(&alive), on_change));
        self.active = Some(ActiveWatch { task, alive });
        debug!(?timing, "change watcher started");
        Ok(())
    }

    /// Cancels the poll and any pending debounce. Does not wait for a callback
    /// already in progress; the cleared liveness flag keeps a late wake-up
    /// from firing. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.alive.store(false, Ordering::Release);
            active.task.abort();
            debug!("change watcher stopped");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_watch<P, F>(
    mut probe: P,
    mut last: Signature,
    timing: WatchTiming,
    alive: Arc<AtomicBool>,
    on_change: F,
) where
    P: StateProbe,
    F: Fn() + Send + Sync + 'static,
{
    let period = timing.poll_interval.max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut debounce = Debounce::new(timing.debounce);

    loop {
        let deadline = debounce.deadline();
        tokio::select! {
            _ = ticker.tick() => {
                match probe.probe() {
                    Ok(sig) if sig != last => {
                        trace!("state file changed");
                        last = sig;
                        debounce.arm(Instant::now());
                    }
                    Ok(_) => {}
                    // The file is briefly absent while it is being replaced.
                    Err(err) => trace!("state probe failed: {err}"),
                }
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if debounce.fire(Instant::now()) {
                    if !alive.load(Ordering::Acquire) {
                        return;
                    }
                    on_change();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_moves_the_single_deadline() {
        let start = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(100));
        assert!(!d.is_armed());
        d.arm(start);
        d.arm(start + Duration::from_millis(40));
        assert_eq!(d.deadline(), Some(start + Duration::from_millis(140)));
        assert!(!d.fire(start + Duration::from_millis(100)));
        assert!(d.fire(start + Duration::from_millis(140)));
        assert!(!d.fire(start + Duration::from_millis(500)));
    }

    #[test]
    fn cancel_disarms() {
        let now = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(10));
        d.arm(now);
        d.cancel();
        assert!(!d.fire(now + Duration::from_secs(1)));
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let mut watcher = ChangeWatcher::new();
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_active());
    }

    #[test]
    fn start_outside_a_runtime_is_refused() {
        let mut watcher = ChangeWatcher::new();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index");
        std::fs::write(&path, b"x").unwrap();
        let result = watcher.start(StateFileProbe::new(path), WatchTiming::default(), || {});
        assert!(matches!(result, Err(WatchError::NoRuntime)));
        assert!(!watcher.is_active());
    }

    #[test]
    fn file_probe_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut probe = StateFileProbe::new(dir.path().join("index"));
        assert!(matches!(probe.probe(), Err(WatchError::Io(_))));
        std::fs::write(probe.path(), b"abc").unwrap();
        assert_eq!(probe.probe().unwrap().len, 3);
    }
}
