//! Session controller for an embedded side-by-side diff viewer.
//!
//! `diffdeck-core` owns everything between a diff engine and a host UI: the
//! lifecycle of one diff session, tree-ordered file and hunk navigation,
//! fingerprint-based refresh reconciliation, and a debounced watcher on the
//! VCS state file. It never computes diffs and never draws anything. Both of
//! those sit behind the [`provider::DiffProvider`] and [`host::HostBridge`]
//! traits, implemented by the `diffdeck` binary.
//!
//! All session mutation happens on the caller's thread. Provider calls run on
//! a worker thread and the watcher runs as a tokio task; both report back as
//! [`event::SessionEvent`]s which the caller feeds into
//! [`controller::SessionController::handle_event`].

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod host;
pub mod model;
pub mod navigation;
pub mod provider;
pub mod reconcile;
pub mod refresh;
pub mod session;
pub mod vcs;
pub mod watcher;
