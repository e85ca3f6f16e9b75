//! The terminal implementation of the controller's host seam.
//!
//! A session occupies three panes: the file tree and the two sides of the
//! diff. `TuiHost` keeps what the controller last asked it to show; the
//! renderer in `ui` draws from it on every frame.

use tracing::{debug, info};

use diffdeck_core::error::HostError;
use diffdeck_core::host::{HostBridge, Notice, SurfaceId};
use diffdeck_core::model::{FileDiff, FileStatus};
use diffdeck_core::session::Selection;

/// One row of the file list, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Provider index, as the controller expects in `SelectFile`.
    pub index: usize,
    pub path: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Default)]
pub struct TuiHost {
    next_id: u64,
    live: Vec<SurfaceId>,
    files: Vec<FileEntry>,
    current: Option<(FileDiff, Selection)>,
    highlighted: Option<usize>,
    /// Position in `files` of the tree cursor.
    tree_cursor: usize,
    notice: Option<Notice>,
}

impl TuiHost {
    pub fn new() -> Self {
        Self { next_id: 1, ..Self::default() }
    }

    /// Whether a session currently owns the screen.
    pub fn has_session(&self) -> bool {
        self.current.is_some() || !self.files.is_empty()
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn current_file(&self) -> Option<&FileDiff> {
        self.current.as_ref().map(|(file, _)| file)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.current.as_ref().map(|(_, selection)| *selection)
    }

    pub fn cursor_row(&self) -> Option<usize> {
        self.selection().map(|s| s.row)
    }

    /// Provider index of the highlighted (current) file.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn tree_cursor(&self) -> usize {
        self.tree_cursor
    }

    /// Provider index of the file under the tree cursor.
    pub fn tree_selection(&self) -> Option<usize> {
        self.files.get(self.tree_cursor).map(|entry| entry.index)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Moves the tree cursor by `delta` entries, clamped to the list.
    pub fn move_tree_cursor(&mut self, delta: isize) {
        let last = self.files.len().saturating_sub(1);
        self.tree_cursor = self.tree_cursor.saturating_add_signed(delta).min(last);
    }

    pub fn set_tree_cursor(&mut self, pos: usize) {
        self.tree_cursor = pos.min(self.files.len().saturating_sub(1));
    }

    /// Mirrors a cursor move the controller accepted without re-rendering.
    pub fn sync_cursor(&mut self, row: usize) {
        if let Some((file, selection)) = &mut self.current {
            selection.row = row;
            selection.hunk = file.hunk_at(row);
        }
    }

    fn clear_session(&mut self) {
        self.files.clear();
        self.current = None;
        self.highlighted = None;
        self.tree_cursor = 0;
    }
}

impl HostBridge for TuiHost {
    fn create_surfaces(&mut self) -> Vec<SurfaceId> {
        let ids: Vec<SurfaceId> = (0..3)
            .map(|_| {
                let id = SurfaceId(self.next_id);
                self.next_id += 1;
                id
            })
            .collect();
        self.live.extend(&ids);
        debug!(?ids, "created panes");
        ids
    }

    fn surface_valid(&self, id: SurfaceId) -> bool {
        self.live.contains(&id)
    }

    fn is_only_surface(&self, id: SurfaceId) -> bool {
        self.live == [id]
    }

    /// The last pane goes back to the idle screen.
    fn restore_prior(&mut self, id: SurfaceId) {
        debug!(%id, "restoring idle screen");
        self.clear_session();
    }

    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), HostError> {
        if !self.live.contains(&id) {
            return Err(HostError::InvalidSurface(id));
        }
        self.live.retain(|&s| s != id);
        Ok(())
    }

    fn show_file_list(&mut self, files: &[FileDiff], order: &[usize]) {
        self.files = order
            .iter()
            .filter_map(|&index| {
                files.get(index).map(|f| FileEntry {
                    index,
                    path: f.path.clone(),
                    status: f.status,
                    additions: f.additions,
                    deletions: f.deletions,
                })
            })
            .collect();
        self.set_tree_cursor(self.tree_cursor);
    }

    fn render(&mut self, file: &FileDiff, selection: &Selection) {
        self.current = Some((file.clone(), *selection));
    }

    fn highlight_selection(&mut self, index: usize) {
        self.highlighted = Some(index);
        if let Some(pos) = self.files.iter().position(|entry| entry.index == index) {
            self.tree_cursor = pos;
        }
    }

    fn notify(&mut self, notice: Notice) {
        info!(%notice, "notice");
        self.notice = Some(notice);
    }
}
