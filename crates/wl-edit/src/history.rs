//! Undo history at the drag boundary
//!
//! The drag engine touches the history through exactly two calls: push a
//! named state on commit, and roll back to the last pushed state on
//! cancel. A consolidating push replaces the previous entry when that
//! entry was also consolidating, so a run of small nudges reads as one
//! action. Entries carry the full serialized project state, which makes
//! rollback a plain state swap.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Project;

/// Editing-layer errors
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Core(#[from] wl_core::WlError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type alias for the editing layer
pub type EditResult<T> = Result<T, EditError>;

/// How a push interacts with the previous entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoPush {
    /// Replace the previous entry when it was also consolidating
    Consolidate,
    /// Always a new entry, marked as an autosave point
    Autosave,
}

/// One committed project state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Full description, e.g. "Time shifted tracks/clips right 0.50 seconds"
    pub name: String,
    /// Short label for menus, e.g. "Time-Shift"
    pub short_name: String,
    /// Entry may be replaced by the next consolidating push
    pub consolidate: bool,
    /// Timestamp (Unix ms)
    pub timestamp: u64,
    /// Serialized project state
    state: Vec<u8>,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Linear history of committed states
pub struct History {
    /// State at history creation; rollback target before any push
    base: Vec<u8>,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Capture the current project state as the rollback base
    pub fn new(project: &Project) -> EditResult<Self> {
        Ok(Self {
            base: serde_json::to_vec(project)?,
            entries: Vec::new(),
        })
    }

    /// Push a named state
    pub fn push(
        &mut self,
        project: &Project,
        name: &str,
        short_name: &str,
        mode: UndoPush,
    ) -> EditResult<()> {
        let state = serde_json::to_vec(project)?;
        let consolidate = mode == UndoPush::Consolidate;

        if consolidate && self.entries.last().is_some_and(|e| e.consolidate) {
            self.entries.pop();
        }
        log::debug!("history push: {name}");
        self.entries.push(HistoryEntry {
            name: name.to_string(),
            short_name: short_name.to_string(),
            consolidate,
            timestamp: current_timestamp(),
            state,
        });
        Ok(())
    }

    /// Restore the last pushed state (or the base) into `project`.
    /// Transport state is preserved; it is not project content.
    pub fn rollback(&self, project: &mut Project) -> EditResult<()> {
        let bytes = self.entries.last().map(|e| &e.state).unwrap_or(&self.base);
        let mut restored: Project = serde_json::from_slice(bytes)?;
        restored.audio_active = project.audio_active;
        *project = restored;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the most recent entry
    pub fn last_name(&self) -> Option<&str> {
        self.entries.last().map(|e| e.name.as_str())
    }
}
