//! Capture set construction
//!
//! At pointer-down the drag engine computes the closed set of clips and
//! whole tracks that move together as a rigid group: the clicked clip,
//! the stereo partner's clip at the click time, everything intersecting
//! an active selection, and the sync-lock closure of all of those.

use wl_core::{Clip, ClipId, TimeSpan, Track, TrackId, TrackKind, WlResult};

use crate::Project;

/// One member of the moving group
#[derive(Debug, Clone)]
pub struct TrackClipEntry {
    /// Track currently holding the clip
    pub track: TrackId,
    /// The moving clip; `None` means the whole track moves
    pub clip: Option<ClipId>,
    /// Track the clip started the session on
    pub origin_track: TrackId,
    /// Destination chosen by the current vertical move
    pub dest_track: TrackId,
    /// Owns the clip while it is detached during vertical validation
    pub held: Option<Clip>,
}

impl TrackClipEntry {
    pub fn new(track: TrackId, clip: Option<ClipId>) -> Self {
        Self {
            track,
            clip,
            origin_track: track,
            dest_track: track,
            held: None,
        }
    }
}

/// Mutable state of one drag session's moving group
#[derive(Debug, Clone, Default)]
pub struct ClipMoveState {
    /// Ordered capture set; later lookups assume earlier entries were
    /// already processed
    pub entries: Vec<TrackClipEntry>,
    /// Tracks captured whole; excluded from snap targets and not treated
    /// as a collection of independently movable clips
    pub excluded_tracks: Vec<TrackId>,
    /// The clip originally clicked, if any
    pub captured_clip: Option<ClipId>,
    /// The capture set represents the active selection
    pub captured_is_selection: bool,
    /// Cumulative horizontal slide applied so far (seconds)
    pub h_slide: f64,
    /// Pixel column of the pointer-down; baseline for drag deltas
    pub click_x: f64,
    /// Snap indicator pixel position for the left edge
    pub snap_left: Option<f64>,
    /// Snap indicator pixel position for the right edge
    pub snap_right: Option<f64>,
}

impl ClipMoveState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains_clip(&self, id: ClipId) -> bool {
        self.entries.iter().any(|e| e.clip == Some(id))
    }

    pub fn contains_whole_track(&self, id: TrackId) -> bool {
        self.entries.iter().any(|e| e.clip.is_none() && e.track == id)
    }

    pub fn clear_snap(&mut self) {
        self.snap_left = None;
        self.snap_right = None;
    }

    /// IDs of the other moving clips on `track`, used as the ignore set
    /// for overlap queries since the group moves as one rigid body
    pub fn moving_clips_on(&self, track: TrackId, except: ClipId) -> Vec<ClipId> {
        self.entries
            .iter()
            .filter(|e| e.track == track)
            .filter_map(|e| e.clip)
            .filter(|&id| id != except)
            .collect()
    }

    pub(crate) fn mark_excluded(&mut self, id: TrackId) {
        if !self.excluded_tracks.contains(&id) {
            self.excluded_tracks.push(id);
        }
    }
}

/// Add a track's content intersecting `span` to the capture set.
///
/// Wave tracks contribute their intersecting clips; label tracks are
/// captured whole; note tracks are captured whole but only when their
/// span intersects the probe. Whole-track captures exclude the track
/// from snap-target and per-clip-overlap consideration.
fn add_clips_to_captured(state: &mut ClipMoveState, track: &Track, span: TimeSpan) {
    match &track.kind {
        TrackKind::Wave { clips, .. } => {
            for clip in clips {
                if clip.span().overlaps(&span) && !state.contains_clip(clip.id) {
                    state.entries.push(TrackClipEntry::new(track.id, Some(clip.id)));
                }
            }
        }
        TrackKind::Note { span: note } => {
            if !note.overlaps(&span) {
                return;
            }
            if !state.contains_whole_track(track.id) {
                state.entries.push(TrackClipEntry::new(track.id, None));
            }
            state.mark_excluded(track.id);
        }
        TrackKind::Label { .. } => {
            if !state.contains_whole_track(track.id) {
                state.entries.push(TrackClipEntry::new(track.id, None));
            }
            state.mark_excluded(track.id);
        }
    }
}

/// Build the capture set for a drag starting on `captured_track`.
///
/// `state.captured_clip` and `state.captured_is_selection` must already
/// be set from the pointer-down.
pub fn build_capture_set(
    state: &mut ClipMoveState,
    project: &Project,
    captured_track: TrackId,
    click_time: f64,
) -> WlResult<()> {
    state.entries.clear();
    state.excluded_tracks.clear();

    if state.captured_is_selection {
        // Capture everything the selection touches, on selected tracks
        let span = project.selection.unwrap_or_default();
        for track in project.tracks.iter() {
            if track.selected {
                add_clips_to_captured(state, track, span);
            }
        }
    } else {
        state
            .entries
            .push(TrackClipEntry::new(captured_track, state.captured_clip));
        if state.captured_clip.is_none() {
            state.mark_excluded(captured_track);
        }

        // Stereo partner: the clip under the same click time moves too
        if state.captured_clip.is_some() {
            if let Some(partner) = project.tracks.partner_of(captured_track) {
                if let Some(partner_track) = project.tracks.get(partner) {
                    if let Some(partner_clip) = partner_track.clip_at_time(click_time) {
                        state
                            .entries
                            .push(TrackClipEntry::new(partner, Some(partner_clip)));
                    }
                }
            }
        }
    }

    if project.sync_lock {
        // The set expands while we walk it, so newly added entries are
        // reconsidered in later iterations; duplicate suppression keeps
        // the fixed point bounded by the number of clips in the project.
        let mut i = 0;
        while i < state.entries.len() {
            let (track_id, clip_id) = {
                let e = &state.entries[i];
                (e.track, e.clip)
            };
            let track = project.tracks.track(track_id)?;
            let probe = match clip_id {
                Some(cid) => track.clip(cid).map(|c| c.span()),
                // Whole-track entries propagate through the group only
                // for note lanes
                None => match &track.kind {
                    TrackKind::Note { span } => Some(*span),
                    _ => None,
                },
            };
            if let (Some(span), Some(group)) = (probe, track.sync_group) {
                for member in project.tracks.group_members(group) {
                    add_clips_to_captured(state, member, span);
                }
            }
            i += 1;
        }
    }

    Ok(())
}
