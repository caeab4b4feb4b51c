//! Project state at the editing boundary
//!
//! Owns the track list, the active time selection, and the flags the
//! drag session consults: sync-lock grouping and the transport guard.

use serde::{Deserialize, Serialize};

use wl_core::{TimeSpan, TrackList};

/// Editable project state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// All tracks in display order
    pub tracks: TrackList,
    /// Active time selection, if any
    pub selection: Option<TimeSpan>,
    /// Sync-lock grouping is enabled
    pub sync_lock: bool,
    /// Transport is playing or recording. Transient state, not project
    /// content: excluded from snapshots.
    #[serde(skip)]
    pub audio_active: bool,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard queried at pointer-down, every pointer-move, and pointer-up
    #[inline]
    pub fn is_audio_active(&self) -> bool {
        self.audio_active
    }

    /// Whether time `t` lies inside the active selection
    pub fn selection_contains(&self, t: f64) -> bool {
        self.selection.is_some_and(|s| s.contains(t))
    }

    /// Move the selection bounds by `delta` seconds
    pub fn move_selection(&mut self, delta: f64) {
        if let Some(s) = &mut self.selection {
            s.shift(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_predicate() {
        let mut project = Project::new();
        assert!(!project.selection_contains(1.0));

        project.selection = Some(TimeSpan::new(1.0, 3.0));
        assert!(project.selection_contains(1.0));
        assert!(!project.selection_contains(3.0));

        project.move_selection(0.5);
        assert_eq!(project.selection.unwrap(), TimeSpan::new(1.5, 3.5));
    }
}
