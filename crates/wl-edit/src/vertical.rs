//! Vertical (cross-track) move validation
//!
//! When the pointer crosses into another audio row, every moving clip is
//! re-homed the same number of rows away, subject to channel-pairing
//! compatibility, and the whole move is validated transactionally: the
//! clips are detached first so they cannot collide with each other, the
//! destinations are checked with a one-pixel tolerance and then strictly,
//! and every exit path reinserts every clip somewhere legal.

use wl_core::{ChannelRole, TrackId, TrackList, WlResult};

use crate::ClipMoveState;

/// Outcome of a vertical move attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerticalMove {
    /// Clips were re-homed; the session baseline must reset
    Moved,
    /// Destinations unsuitable; track membership is unchanged
    Rejected,
}

/// Attempt to move every captured clip from its current row to the row
/// the pointer is on. `desired` may be nudged within `tolerance` to make
/// the clips fit; on rejection it is restored to the requested value.
pub(crate) fn try_slide_vertical(
    state: &mut ClipMoveState,
    tracks: &mut TrackList,
    captured_track: TrackId,
    pointer_track: TrackId,
    desired: &mut f64,
    tolerance: f64,
) -> WlResult<VerticalMove> {
    let (Some(from_row), Some(to_row)) = (
        tracks.audio_row_of(captured_track),
        tracks.audio_row_of(pointer_track),
    ) else {
        return Ok(VerticalMove::Rejected);
    };
    let row_offset = to_row as isize - from_row as isize;

    // Resolve a destination for every moving clip before touching
    // anything. Mono may only land on mono; a paired channel only on a
    // paired channel with the same left/right role.
    for i in 0..state.entries.len() {
        let entry = &state.entries[i];
        if entry.clip.is_none() {
            continue;
        }
        let src = tracks.track(entry.track)?;
        let src_role = src.role;
        let src_paired = src.partner.is_some();

        let Some(src_row) = tracks.audio_row_of(entry.track) else {
            return Ok(VerticalMove::Rejected);
        };
        let target_row = src_row as isize + row_offset;
        if target_row < 0 {
            return Ok(VerticalMove::Rejected);
        }
        let Some(mut dest) = tracks.audio_track_at_row(target_row as usize) else {
            return Ok(VerticalMove::Rejected);
        };
        // A right channel lands on the destination row's right channel
        if src_paired && src_role == ChannelRole::Right {
            match tracks.partner_of(dest) {
                Some(partner) => dest = partner,
                None => return Ok(VerticalMove::Rejected),
            }
        }
        let dest_track = tracks.track(dest)?;
        let compatible = src_paired == dest_track.partner.is_some()
            && (!src_paired || src_role == dest_track.role);
        if !compatible {
            return Ok(VerticalMove::Rejected);
        }
        state.entries[i].dest_track = dest;
    }

    // Detach the moving clips so they do not collide with each other
    // while the destinations are probed
    let requested = *desired;
    let mut extracted = ExtractedClips::new(state, tracks)?;

    // First pass may spend the one-pixel tolerance nudging the delta;
    // the second pass re-checks the nudged delta strictly
    let mut tol = tolerance;
    let mut ok = extracted.validate(desired, &mut tol);
    if ok {
        let mut zero = 0.0;
        ok = extracted.validate(desired, &mut zero);
    }

    if !ok {
        extracted.fail();
        drop(extracted); // reinserts into the original tracks
        *desired = requested;
        return Ok(VerticalMove::Rejected);
    }

    drop(extracted); // reinserts into the destination tracks
    Ok(VerticalMove::Moved)
}

/// Scoped extraction of the moving clips.
///
/// On drop, every held clip is reinserted into its entry's
/// `dest_track`: the destinations on the success path, or the original
/// tracks again after `fail()`. The track/clip graph is consistent on
/// every exit.
struct ExtractedClips<'a> {
    state: &'a mut ClipMoveState,
    tracks: &'a mut TrackList,
}

impl<'a> ExtractedClips<'a> {
    fn new(state: &'a mut ClipMoveState, tracks: &'a mut TrackList) -> WlResult<Self> {
        let mut guard = Self { state, tracks };
        if let Err(e) = guard.extract() {
            guard.fail();
            return Err(e);
        }
        Ok(guard)
    }

    fn extract(&mut self) -> WlResult<()> {
        for entry in self.state.entries.iter_mut() {
            if let Some(id) = entry.clip {
                entry.held = Some(self.tracks.track_mut(entry.track)?.remove_clip(id)?);
            }
        }
        Ok(())
    }

    /// Would every held clip, shifted by `delta`, fit its destination?
    fn validate(&self, delta: &mut f64, tolerance: &mut f64) -> bool {
        for entry in &self.state.entries {
            if let Some(held) = &entry.held {
                let Some(dest) = self.tracks.get(entry.dest_track) else {
                    return false;
                };
                if !dest.can_insert_clip(held, delta, tolerance) {
                    return false;
                }
            }
        }
        true
    }

    /// Redirect every destination back to the source track
    fn fail(&mut self) {
        for entry in self.state.entries.iter_mut() {
            entry.dest_track = entry.track;
        }
    }
}

impl Drop for ExtractedClips<'_> {
    fn drop(&mut self) {
        for entry in self.state.entries.iter_mut() {
            if let Some(clip) = entry.held.take() {
                if let Some(track) = self.tracks.get_mut(entry.dest_track) {
                    let _ = track.add_clip(clip);
                }
                // The destination becomes the source for the next move
                entry.track = entry.dest_track;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackClipEntry;
    use wl_core::{Clip, Track};

    fn wave_with_clips(name: &str, spans: &[(f64, f64)]) -> Track {
        let mut track = Track::wave(name, 44_100.0);
        for (i, &(a, b)) in spans.iter().enumerate() {
            track
                .add_clip(Clip::from_span(&format!("{name}-{i}"), a, b, 44_100.0))
                .unwrap();
        }
        track
    }

    fn capture_clip(tracks: &TrackList, track: TrackId, index: usize) -> ClipMoveState {
        let mut state = ClipMoveState::default();
        let clip = tracks.get(track).unwrap().clips()[index].id;
        state.captured_clip = Some(clip);
        state.entries.push(TrackClipEntry::new(track, Some(clip)));
        state
    }

    #[test]
    fn test_move_to_empty_mono_track() {
        let mut tracks = TrackList::new();
        let t1 = tracks.add(wave_with_clips("T1", &[(2.0, 5.0)]));
        let t2 = tracks.add(Track::wave("T2", 48_000.0));
        let mut state = capture_clip(&tracks, t1, 0);
        let clip_id = state.captured_clip.unwrap();

        let mut desired = 0.5;
        let result =
            try_slide_vertical(&mut state, &mut tracks, t1, t2, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Moved);
        assert_eq!(desired, 0.5);
        assert!(tracks.get(t1).unwrap().clips().is_empty());
        assert!(tracks.get(t2).unwrap().clip(clip_id).is_some());
        assert_eq!(state.entries[0].track, t2);
        assert_eq!(state.entries[0].origin_track, t1);
    }

    #[test]
    fn test_stereo_channel_cannot_land_on_mono() {
        let mut tracks = TrackList::new();
        let l = tracks.add(wave_with_clips("L", &[(2.0, 5.0)]));
        let r = tracks.add(wave_with_clips("R", &[(2.0, 5.0)]));
        let mono = tracks.add(Track::wave("M", 44_100.0));
        tracks.link_stereo(l, r).unwrap();

        let mut state = capture_clip(&tracks, l, 0);
        let r_clip = tracks.get(r).unwrap().clips()[0].id;
        state.entries.push(TrackClipEntry::new(r, Some(r_clip)));

        let mut desired = 0.25;
        let result =
            try_slide_vertical(&mut state, &mut tracks, l, mono, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Rejected);
        assert_eq!(desired, 0.25);
        // Atomicity: membership is exactly as before
        assert_eq!(tracks.get(l).unwrap().clips().len(), 1);
        assert_eq!(tracks.get(r).unwrap().clips().len(), 1);
        assert!(tracks.get(mono).unwrap().clips().is_empty());
        assert_eq!(state.entries[0].track, l);
        assert_eq!(state.entries[1].track, r);
    }

    #[test]
    fn test_stereo_pair_moves_channelwise() {
        let mut tracks = TrackList::new();
        let l1 = tracks.add(wave_with_clips("L1", &[(0.0, 1.0)]));
        let r1 = tracks.add(wave_with_clips("R1", &[(0.0, 1.0)]));
        let l2 = tracks.add(Track::wave("L2", 44_100.0));
        let r2 = tracks.add(Track::wave("R2", 44_100.0));
        tracks.link_stereo(l1, r1).unwrap();
        tracks.link_stereo(l2, r2).unwrap();

        let mut state = capture_clip(&tracks, l1, 0);
        let r_clip = tracks.get(r1).unwrap().clips()[0].id;
        state.entries.push(TrackClipEntry::new(r1, Some(r_clip)));

        let mut desired = 0.0;
        let result =
            try_slide_vertical(&mut state, &mut tracks, l1, l2, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Moved);
        // Left landed on left, right on right
        assert_eq!(tracks.get(l2).unwrap().clips().len(), 1);
        assert_eq!(tracks.get(r2).unwrap().clips().len(), 1);
        assert!(tracks.get(l1).unwrap().clips().is_empty());
        assert!(tracks.get(r1).unwrap().clips().is_empty());
    }

    #[test]
    fn test_occupied_destination_rejects_and_restores() {
        let mut tracks = TrackList::new();
        let t1 = tracks.add(wave_with_clips("T1", &[(2.0, 5.0)]));
        let t2 = tracks.add(wave_with_clips("T2", &[(3.0, 4.0)]));
        let mut state = capture_clip(&tracks, t1, 0);

        let mut desired = 0.0;
        let result =
            try_slide_vertical(&mut state, &mut tracks, t1, t2, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Rejected);
        assert_eq!(tracks.get(t1).unwrap().clips().len(), 1);
        assert_eq!(tracks.get(t1).unwrap().clips()[0].start, 2.0);
        assert_eq!(tracks.get(t2).unwrap().clips().len(), 1);
        assert!(tracks.is_consistent());
    }

    #[test]
    fn test_tolerance_nudges_delta_to_fit() {
        let mut tracks = TrackList::new();
        let t1 = tracks.add(wave_with_clips("T1", &[(0.0, 2.0)]));
        // Destination has exactly a 2-second slot ending at 4.0
        let t2 = tracks.add(wave_with_clips("T2", &[(4.0, 6.0)]));
        let mut state = capture_clip(&tracks, t1, 0);

        // Requested delta leaves a 0.005 s overlap with the clip at 4.0
        let mut desired = 2.005;
        let result =
            try_slide_vertical(&mut state, &mut tracks, t1, t2, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Moved);
        assert!((desired - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_destination_row_rejects() {
        let mut tracks = TrackList::new();
        let t1 = tracks.add(wave_with_clips("T1", &[(0.0, 1.0)]));
        let t2 = tracks.add(wave_with_clips("T2", &[(5.0, 6.0)]));
        let mut state = capture_clip(&tracks, t1, 0);
        // Also capture the clip on the last row; shifting down one row
        // leaves it nowhere to go
        let b = tracks.get(t2).unwrap().clips()[0].id;
        state.entries.push(TrackClipEntry::new(t2, Some(b)));

        let mut desired = 0.0;
        let result =
            try_slide_vertical(&mut state, &mut tracks, t1, t2, &mut desired, 0.01).unwrap();

        assert_eq!(result, VerticalMove::Rejected);
        assert_eq!(tracks.get(t1).unwrap().clips().len(), 1);
        assert_eq!(tracks.get(t2).unwrap().clips().len(), 1);
    }
}
