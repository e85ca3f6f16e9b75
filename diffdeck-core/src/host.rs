//! The seam between the controller and the UI that displays a session.
//!
//! Surfaces (panes, windows, tabs) belong to the host. The controller only
//! keeps their [`SurfaceId`]s and asks the host to release them on close.

use std::fmt;

use crate::error::HostError;
use crate::model::{FileDiff, Location, Side};
use crate::session::Selection;

/// Opaque handle to a host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User-visible messages the controller asks the host to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The provider returned no files; the session was closed.
    NoChanges,
    /// Auto-refresh is off for this session.
    WatchDisabled { reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoChanges => f.write_str("No changes"),
            Notice::WatchDisabled { reason } => write!(f, "Auto-refresh disabled: {reason}"),
        }
    }
}

/// Operations the controller performs on the host. Called on the primary
/// context only.
pub trait HostBridge {
    /// Allocates the panes of a session and returns their handles.
    fn create_surfaces(&mut self) -> Vec<SurfaceId>;

    /// Whether `id` still refers to a live surface.
    fn surface_valid(&self, id: SurfaceId) -> bool;

    /// Whether `id` is the last live surface the host has.
    fn is_only_surface(&self, id: SurfaceId) -> bool;

    /// Puts back whatever the surface showed before the session took it over.
    fn restore_prior(&mut self, id: SurfaceId);

    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), HostError>;

    /// Called whenever the file list changes. `order` is the display order as
    /// provider indices into `files`.
    fn show_file_list(&mut self, files: &[FileDiff], order: &[usize]);

    fn render(&mut self, file: &FileDiff, selection: &Selection);

    fn highlight_selection(&mut self, index: usize);

    fn notify(&mut self, notice: Notice);
}

/// User-driven requests flowing from the host back into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    NextFile,
    PrevFile,
    NextHunk,
    PrevHunk,
    /// Select a file by provider index, e.g. from a click in the file list.
    SelectFile(usize),
    /// The host moved its cursor to `row` of the current file.
    SetRow(usize),
    /// Resolve `row` of the current file to a source location on `side`.
    GotoLine { side: Side, row: usize, col: u32 },
    Refresh,
    /// A buffer belonging to the repository was written.
    Saved,
    Close,
}

/// Result of dispatching a [`HostCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled,
    /// Goto-line resolved to this location; the host should open it.
    Goto(Location),
    Closed,
    /// Nothing to do: no session, out of range, or at a boundary.
    Ignored,
}
