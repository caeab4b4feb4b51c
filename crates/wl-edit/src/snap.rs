//! Snap resolution
//!
//! Magnetic adjustment of the moving group's edges to nearby stationary
//! edges. The index is built once at pointer-down from every non-moving
//! clip edge and non-excluded span edge; each pointer-move asks whether
//! the group's candidate left or right edge lands within a
//! pixel-proportional tolerance of a stationary edge. At most one edge
//! is allowed to win.

use wl_core::{TrackId, TrackKind, WlResult, quantize_to_rate};

use crate::{ClipMoveState, Project, Viewport};

/// Snap tolerance in pixels at the current zoom
pub const SNAP_PIXEL_TOLERANCE: f64 = 4.0;

/// Sorted index of stationary edge times
#[derive(Debug, Clone, Default)]
pub struct SnapIndex {
    points: Vec<f64>,
}

impl SnapIndex {
    /// Collect the edges of everything that is not moving: clips outside
    /// the capture set, and the spans of tracks not captured whole.
    pub fn new(project: &Project, state: &ClipMoveState) -> Self {
        let mut points = Vec::new();
        for track in project.tracks.iter() {
            if state.excluded_tracks.contains(&track.id) {
                continue;
            }
            match &track.kind {
                TrackKind::Wave { clips, .. } => {
                    for clip in clips {
                        if !state.contains_clip(clip.id) {
                            points.push(clip.start);
                            points.push(clip.end());
                        }
                    }
                }
                TrackKind::Label { span } | TrackKind::Note { span } => {
                    points.push(span.start);
                    points.push(span.end);
                }
            }
        }
        points.sort_by(f64::total_cmp);
        points.dedup();
        Self { points }
    }

    /// Nearest stationary edge within `tolerance` of `t`, if any
    pub fn snap(&self, t: f64, tolerance: f64) -> Option<f64> {
        let i = self.points.partition_point(|&p| p < t);
        let mut best: Option<f64> = None;
        for candidate in [i.checked_sub(1).and_then(|j| self.points.get(j)), self.points.get(i)]
            .into_iter()
            .flatten()
        {
            let closer = best.is_none_or(|b| (candidate - t).abs() < (b - t).abs());
            if (candidate - t).abs() <= tolerance && closer {
                best = Some(*candidate);
            }
        }
        best
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Compute the desired slide for the current pointer position: the raw
/// pointer delta, quantized to the captured track's sample grid, then
/// adjusted so that at most one of the group's edges snaps to a
/// stationary edge. Snap indicator positions land in `state`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_desired_slide(
    state: &mut ClipMoveState,
    project: &Project,
    viewport: &Viewport,
    snap_index: &SnapIndex,
    captured_track: TrackId,
    x: f64,
    vertical_only: bool,
    prefer_right_edge: bool,
) -> WlResult<f64> {
    if vertical_only {
        return Ok(0.0);
    }

    let mut desired = viewport.time_at(x) - viewport.time_at(state.click_x);

    let captured = project.tracks.track(captured_track)?;
    if let Some(rate) = captured.rate() {
        // Keep the delta on the captured track's sample grid
        desired = quantize_to_rate(desired, rate);
    }

    // Candidate edges of the originally captured clip, or of the whole
    // captured track when no single clip was grabbed
    let span = match state.captured_clip.and_then(|id| captured.clip(id)) {
        Some(clip) => clip.span(),
        None => captured.span(),
    };
    let left = span.start + desired;
    let right = span.end + desired;

    let tolerance = SNAP_PIXEL_TOLERANCE * viewport.time_per_pixel();
    let mut new_left = snap_index.snap(left, tolerance).unwrap_or(left);
    let mut new_right = snap_index.snap(right, tolerance).unwrap_or(right);

    // Only one edge is allowed to snap; the edge nearer the original
    // click wins a conflict
    if new_left != left && new_right != right {
        if prefer_right_edge {
            new_left = left;
        } else {
            new_right = right;
        }
    }

    state.clear_snap();
    if new_left != left {
        desired += new_left - left;
        state.snap_left = Some(viewport.pixel_of(new_left));
    } else if new_right != right {
        desired += new_right - right;
        state.snap_right = Some(viewport.pixel_of(new_right));
    }

    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_core::{Clip, Track};

    fn project_two_tracks() -> (Project, TrackId, TrackId) {
        let mut project = Project::new();
        let mut moving = Track::wave("Moving", 44_100.0);
        moving
            .add_clip(Clip::from_span("A", 2.0, 5.0, 44_100.0))
            .unwrap();
        let mut still = Track::wave("Still", 44_100.0);
        still
            .add_clip(Clip::from_span("B", 6.0, 8.0, 44_100.0))
            .unwrap();
        let a = project.tracks.add(moving);
        let b = project.tracks.add(still);
        (project, a, b)
    }

    fn capture_single_clip(project: &Project, track: TrackId) -> ClipMoveState {
        let mut state = ClipMoveState::default();
        let clip = project.tracks.get(track).unwrap().clips()[0].id;
        state.captured_clip = Some(clip);
        state.entries.push(crate::TrackClipEntry::new(track, Some(clip)));
        state
    }

    #[test]
    fn test_index_excludes_captured_clips_and_tracks() {
        let (mut project, a, _b) = project_two_tracks();
        let lbl = project
            .tracks
            .add(Track::label("Markers", wl_core::TimeSpan::new(0.0, 1.0)));

        let mut state = capture_single_clip(&project, a);
        state.excluded_tracks.push(lbl);
        let index = SnapIndex::new(&project, &state);

        // Only the stationary clip's edges remain
        assert_eq!(index.snap(6.0, 0.01), Some(6.0));
        assert_eq!(index.snap(8.0, 0.01), Some(8.0));
        assert_eq!(index.snap(2.0, 0.01), None); // captured clip edge
        assert_eq!(index.snap(0.0, 0.01), None); // excluded label edge
    }

    #[test]
    fn test_snap_picks_nearest_within_tolerance() {
        let index = SnapIndex {
            points: vec![1.0, 2.0, 5.0],
        };
        assert_eq!(index.snap(1.9, 0.2), Some(2.0));
        assert_eq!(index.snap(1.4, 0.45), Some(1.0)); // nearer of the two
        assert_eq!(index.snap(3.5, 0.2), None);
    }

    #[test]
    fn test_desired_slide_snaps_one_edge_only() {
        let (project, a, _b) = project_two_tracks();
        let mut state = capture_single_clip(&project, a);
        let viewport = Viewport::default(); // 100 px/s, 4 px tolerance = 0.04 s
        state.click_x = 300.0; // t = 3.0, nearer the clip start
        let index = SnapIndex::new(&project, &state);

        // Raw delta 0.98 puts the right edge at 5.98, within tolerance of 6.0
        let desired = find_desired_slide(
            &mut state, &project, &viewport, &index, a, 398.0, false, false,
        )
        .unwrap();
        assert!((desired - 1.0).abs() < 1e-9);
        assert_eq!(state.snap_left, None);
        assert_eq!(state.snap_right, Some(600.0));

        // At most one indicator is ever set
        assert!(state.snap_left.is_none() || state.snap_right.is_none());
    }

    #[test]
    fn test_delta_is_sample_quantized() {
        let (project, a, _b) = project_two_tracks();
        let mut state = capture_single_clip(&project, a);
        let viewport = Viewport::default();
        state.click_x = 100.0;

        // An awkward pixel position still lands on the sample grid
        let desired = find_desired_slide(
            &mut state, &project, &viewport, &index_empty(), a, 133.3, false, false,
        )
        .unwrap();
        let samples = desired * 44_100.0;
        assert!((samples - samples.round()).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_only_pins_delta_to_zero() {
        let (project, a, _b) = project_two_tracks();
        let mut state = capture_single_clip(&project, a);
        let viewport = Viewport::default();
        state.click_x = 100.0;

        let desired = find_desired_slide(
            &mut state, &project, &viewport, &index_empty(), a, 500.0, true, false,
        )
        .unwrap();
        assert_eq!(desired, 0.0);
    }

    fn index_empty() -> SnapIndex {
        SnapIndex::default()
    }
}
