//! Horizontal slide resolution
//!
//! Converges a requested time delta to the largest same-sign delta that
//! keeps every moving clip clear of the stationary clips on its track,
//! then applies it. Moving clips are never obstacles to each other: the
//! overlap query is told to ignore the rest of the group.

use wl_core::{TrackId, TrackList, WlResult};

use crate::ClipMoveState;

/// Offset every captured entry by `delta` seconds. With an empty capture
/// set (a bare shift-click) the captured track itself shifts, together
/// with its stereo partner.
pub(crate) fn do_offset(
    state: &ClipMoveState,
    tracks: &mut TrackList,
    captured_track: Option<TrackId>,
    delta: f64,
) -> WlResult<()> {
    if delta == 0.0 {
        return Ok(());
    }
    if !state.entries.is_empty() {
        for entry in &state.entries {
            let track = tracks.track_mut(entry.track)?;
            match entry.clip {
                Some(id) => {
                    if let Some(clip) = track.clip_mut(id) {
                        clip.offset(delta);
                    }
                }
                None => track.offset(delta),
            }
        }
    } else if let Some(id) = captured_track {
        tracks.track_mut(id)?.offset(delta);
        if let Some(partner) = tracks.partner_of(id) {
            tracks.track_mut(partner)?.offset(delta);
        }
    }
    Ok(())
}

/// Shrink `state.h_slide` until every moving clip fits, then move.
///
/// Fixed-point iteration: each pass takes the minimum-magnitude answer
/// across the group, and a pass that changes nothing ends the loop. Each
/// pass can only shrink the magnitude, so termination is certain; the
/// pass count is still bounded by the capture-set size against
/// future-introduced edge cases. A shrunk delta invalidates any snap
/// indicator, since the snapped edge no longer lands on its target.
pub(crate) fn do_slide_horizontal(
    state: &mut ClipMoveState,
    tracks: &mut TrackList,
    captured_track: TrackId,
) -> WlResult<()> {
    if state.entries.is_empty() {
        // Bare shift-click: whole tracks never overlap by definition
        return do_offset(state, tracks, Some(captured_track), state.h_slide);
    }

    let max_passes = state.entries.len() + 1;
    for _ in 0..max_passes {
        let initial = state.h_slide;
        for i in 0..state.entries.len() {
            let entry = &state.entries[i];
            let Some(clip_id) = entry.clip else {
                continue;
            };
            let ignore = state.moving_clips_on(entry.track, clip_id);
            let allowed = tracks
                .track(entry.track)?
                .can_offset_clip(clip_id, state.h_slide, &ignore)?;
            if allowed != state.h_slide {
                state.h_slide = allowed;
                // Snapping and forced shrink are mutually exclusive
                state.clear_snap();
            }
        }
        if state.h_slide == initial {
            break;
        }
    }

    do_offset(state, tracks, None, state.h_slide)
}
