//! Tracks and the track list
//!
//! Wave tracks own a set of non-overlapping clips; label and note tracks
//! are opaque single-span lanes that move as a whole. Two wave tracks can
//! be paired into a stereo link (left/right). Vertical drag distance is
//! measured in audio-track rows, which count only primary channels and
//! skip right-channel partners.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::{Clip, ClipId, TimeSpan, WlError, WlResult, seconds_to_samples};

/// Unique track ID generator
static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

fn new_track_id() -> TrackId {
    TrackId(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Stereo channel role of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelRole {
    #[default]
    Mono,
    Left,
    Right,
}

/// Track content. A closed set: drag logic matches on it exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackKind {
    /// Audio clips at the track's sample rate
    Wave { rate: f64, clips: Vec<Clip> },
    /// Label lane; a single span that moves as a whole
    Label { span: TimeSpan },
    /// Note lane; a single span that moves as a whole
    Note { span: TimeSpan },
}

impl TrackKind {
    /// Whether clips on this track move independently (wave tracks) or
    /// the track moves as one unit (label/note tracks).
    pub fn supports_clips(&self) -> bool {
        matches!(self, Self::Wave { .. })
    }
}

/// A single timeline track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Content kind
    pub kind: TrackKind,
    /// Included in the active selection
    pub selected: bool,
    /// Stereo channel role
    pub role: ChannelRole,
    /// Stereo partner (symmetric, non-owning)
    pub partner: Option<TrackId>,
    /// Sync-lock group; tracks sharing a group move together
    pub sync_group: Option<u32>,
}

impl Track {
    fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: new_track_id(),
            name: name.into(),
            kind,
            selected: false,
            role: ChannelRole::Mono,
            partner: None,
            sync_group: None,
        }
    }

    /// Create a wave track at `rate`
    pub fn wave(name: impl Into<String>, rate: f64) -> Self {
        Self::new(
            name,
            TrackKind::Wave {
                rate,
                clips: Vec::new(),
            },
        )
    }

    /// Create a label track spanning `span`
    pub fn label(name: impl Into<String>, span: TimeSpan) -> Self {
        Self::new(name, TrackKind::Label { span })
    }

    /// Create a note track spanning `span`
    pub fn note(name: impl Into<String>, span: TimeSpan) -> Self {
        Self::new(name, TrackKind::Note { span })
    }

    /// Sample rate for wave tracks
    pub fn rate(&self) -> Option<f64> {
        match &self.kind {
            TrackKind::Wave { rate, .. } => Some(*rate),
            _ => None,
        }
    }

    /// Clips on this track (empty for label/note tracks)
    pub fn clips(&self) -> &[Clip] {
        match &self.kind {
            TrackKind::Wave { clips, .. } => clips,
            _ => &[],
        }
    }

    /// Look up a clip by ID
    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips().iter().find(|c| c.id == id)
    }

    /// Look up a clip by ID, mutable
    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        match &mut self.kind {
            TrackKind::Wave { clips, .. } => clips.iter_mut().find(|c| c.id == id),
            _ => None,
        }
    }

    /// Earliest occupied time (0.0 for an empty wave track)
    pub fn start_time(&self) -> f64 {
        match &self.kind {
            TrackKind::Wave { clips, .. } => {
                if clips.is_empty() {
                    0.0
                } else {
                    clips.iter().map(|c| c.start).fold(f64::INFINITY, f64::min)
                }
            }
            TrackKind::Label { span } | TrackKind::Note { span } => span.start,
        }
    }

    /// Latest occupied time (0.0 for an empty wave track)
    pub fn end_time(&self) -> f64 {
        match &self.kind {
            TrackKind::Wave { clips, .. } => {
                if clips.is_empty() {
                    0.0
                } else {
                    clips
                        .iter()
                        .map(|c| c.end())
                        .fold(f64::NEG_INFINITY, f64::max)
                }
            }
            TrackKind::Label { span } | TrackKind::Note { span } => span.end,
        }
    }

    /// Occupied interval
    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start_time(), self.end_time())
    }

    /// Move every clip (or the whole span) by `delta` seconds
    pub fn offset(&mut self, delta: f64) {
        match &mut self.kind {
            TrackKind::Wave { clips, .. } => {
                for clip in clips {
                    clip.offset(delta);
                }
            }
            TrackKind::Label { span } | TrackKind::Note { span } => span.shift(delta),
        }
    }

    /// The clip whose sample span contains time `t`, if any.
    ///
    /// The sample index is computed from the time directly rather than
    /// through any on-screen lookup, which is only valid for visible clips.
    pub fn clip_at_time(&self, t: f64) -> Option<ClipId> {
        let TrackKind::Wave { rate, clips } = &self.kind else {
            return None;
        };
        let s0 = seconds_to_samples(t, *rate);
        if s0 < 0 {
            return None;
        }
        clips
            .iter()
            .find(|c| {
                let first = seconds_to_samples(c.start, *rate);
                first <= s0 && s0 < first + c.len_samples as i64
            })
            .map(|c| c.id)
    }

    /// Largest-magnitude offset of `id`, same sign as `desired` and no
    /// larger in magnitude, that avoids overlap with every stationary
    /// clip on this track. Clips in `ignore` (the rest of the moving
    /// group) are not treated as obstacles. Returns 0.0 when the clip
    /// cannot move at all.
    pub fn can_offset_clip(&self, id: ClipId, desired: f64, ignore: &[ClipId]) -> WlResult<f64> {
        let TrackKind::Wave { clips, .. } = &self.kind else {
            return Err(WlError::NotAWaveTrack(self.id));
        };
        let clip = self.clip(id).ok_or(WlError::ClipNotFound(id))?;
        let span = clip.span();

        let mut allowed = desired;
        for other in clips {
            if other.id == id || ignore.contains(&other.id) {
                continue;
            }
            if other.start >= span.start {
                // Obstacle at or to the right of the moving clip
                if desired > 0.0 {
                    allowed = allowed.min(other.start - span.end);
                }
            } else if desired < 0.0 {
                // Obstacle to the left
                allowed = allowed.max(other.end() - span.start);
            }
        }

        // Same sign as requested, magnitude never larger
        Ok(if desired >= 0.0 {
            allowed.max(0.0)
        } else {
            allowed.min(0.0)
        })
    }

    /// Whether a detached `clip`, shifted by `delta`, fits on this track.
    ///
    /// A small overlap can be rescued by nudging `delta` within the
    /// remaining `tolerance`; a spent tolerance is divided down rather
    /// than zeroed so one further micro-move of rounding-error size is
    /// still allowed.
    pub fn can_insert_clip(&self, clip: &Clip, delta: &mut f64, tolerance: &mut f64) -> bool {
        let TrackKind::Wave { clips, .. } = &self.kind else {
            return false;
        };
        for c in clips {
            let d1 = c.start - (clip.end() + *delta);
            let d2 = (clip.start + *delta) - c.end();
            if d1 < 0.0 && d2 < 0.0 {
                // Shifted clip overlaps c
                if -d1 < *tolerance {
                    // Trailing edge overlaps slightly; nudge left
                    *delta += d1;
                    *tolerance /= 1000.0;
                } else if -d2 < *tolerance {
                    // Leading edge overlaps slightly; nudge right
                    *delta -= d2;
                    *tolerance /= 1000.0;
                } else {
                    return false;
                }
            }
        }
        true
    }

    /// Detach a clip from this track, transferring ownership to the caller
    pub fn remove_clip(&mut self, id: ClipId) -> WlResult<Clip> {
        match &mut self.kind {
            TrackKind::Wave { clips, .. } => {
                let at = clips
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or(WlError::ClipNotFound(id))?;
                Ok(clips.remove(at))
            }
            _ => Err(WlError::NotAWaveTrack(self.id)),
        }
    }

    /// Attach an owned clip to this track
    pub fn add_clip(&mut self, clip: Clip) -> WlResult<()> {
        match &mut self.kind {
            TrackKind::Wave { clips, .. } => {
                clips.push(clip);
                Ok(())
            }
            _ => Err(WlError::NotAWaveTrack(self.id)),
        }
    }

    /// True when no two clips on this track overlap in time
    pub fn clips_non_overlapping(&self) -> bool {
        let clips = self.clips();
        for (i, a) in clips.iter().enumerate() {
            for b in &clips[i + 1..] {
                if a.span().overlaps(&b.span()) {
                    return false;
                }
            }
        }
        true
    }
}

/// Ordered collection of tracks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track, returning its ID
    pub fn add(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    /// Get track by ID
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Get mutable track by ID
    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Get track by ID or fail
    pub fn track(&self, id: TrackId) -> WlResult<&Track> {
        self.get(id).ok_or(WlError::TrackNotFound(id))
    }

    /// Get mutable track by ID or fail
    pub fn track_mut(&mut self, id: TrackId) -> WlResult<&mut Track> {
        self.get_mut(id).ok_or(WlError::TrackNotFound(id))
    }

    /// All tracks in display order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Pair two wave tracks as a stereo link (left/right)
    pub fn link_stereo(&mut self, left: TrackId, right: TrackId) -> WlResult<()> {
        for id in [left, right] {
            if !self.track(id)?.kind.supports_clips() {
                return Err(WlError::NotAWaveTrack(id));
            }
        }
        let t = self.track_mut(left)?;
        t.role = ChannelRole::Left;
        t.partner = Some(right);
        let t = self.track_mut(right)?;
        t.role = ChannelRole::Right;
        t.partner = Some(left);
        Ok(())
    }

    /// Stereo partner of a track, if paired
    pub fn partner_of(&self, id: TrackId) -> Option<TrackId> {
        self.get(id).and_then(|t| t.partner)
    }

    /// Dense 0-based audio row of a track: wave tracks only, counting
    /// only primary channels (a right channel reports its partner's row).
    pub fn audio_row_of(&self, id: TrackId) -> Option<usize> {
        let target = self.get(id)?;
        if !target.kind.supports_clips() {
            return None;
        }
        let primary = if target.role == ChannelRole::Right {
            target.partner?
        } else {
            id
        };
        let mut row = 0;
        for t in &self.tracks {
            if !t.kind.supports_clips() || t.role == ChannelRole::Right {
                continue;
            }
            if t.id == primary {
                return Some(row);
            }
            row += 1;
        }
        None
    }

    /// Primary wave track at a given audio row
    pub fn audio_track_at_row(&self, row: usize) -> Option<TrackId> {
        self.tracks
            .iter()
            .filter(|t| t.kind.supports_clips() && t.role != ChannelRole::Right)
            .nth(row)
            .map(|t| t.id)
    }

    /// Tracks belonging to a sync-lock group
    pub fn group_members(&self, group: u32) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(move |t| t.sync_group == Some(group))
    }

    /// Earliest occupied time across all tracks
    pub fn start_time(&self) -> f64 {
        if self.tracks.is_empty() {
            return 0.0;
        }
        self.tracks
            .iter()
            .map(|t| t.start_time())
            .fold(f64::INFINITY, f64::min)
    }

    /// Latest occupied time across all tracks
    pub fn end_time(&self) -> f64 {
        if self.tracks.is_empty() {
            return 0.0;
        }
        self.tracks
            .iter()
            .map(|t| t.end_time())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// The whole-list invariant: no two clips overlap within any track
    pub fn is_consistent(&self) -> bool {
        self.tracks.iter().all(|t| t.clips_non_overlapping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_with_clips(name: &str, spans: &[(f64, f64)]) -> Track {
        let mut track = Track::wave(name, 44_100.0);
        for (i, &(a, b)) in spans.iter().enumerate() {
            track
                .add_clip(Clip::from_span(&format!("{name}-{i}"), a, b, 44_100.0))
                .unwrap();
        }
        track
    }

    #[test]
    fn test_audio_rows_skip_right_channels() {
        let mut list = TrackList::new();
        let l = list.add(Track::wave("Drums L", 44_100.0));
        let r = list.add(Track::wave("Drums R", 44_100.0));
        let lbl = list.add(Track::label("Markers", TimeSpan::new(0.0, 10.0)));
        let m = list.add(Track::wave("Bass", 44_100.0));
        list.link_stereo(l, r).unwrap();

        assert_eq!(list.audio_row_of(l), Some(0));
        assert_eq!(list.audio_row_of(r), Some(0)); // partner shares the row
        assert_eq!(list.audio_row_of(m), Some(1)); // label track not counted
        assert_eq!(list.audio_row_of(lbl), None);

        assert_eq!(list.audio_track_at_row(0), Some(l));
        assert_eq!(list.audio_track_at_row(1), Some(m));
        assert_eq!(list.audio_track_at_row(2), None);
    }

    #[test]
    fn test_clip_at_time_uses_sample_index() {
        let track = wave_with_clips("T", &[(2.0, 5.0)]);
        let id = track.clips()[0].id;
        assert_eq!(track.clip_at_time(2.0), Some(id));
        assert_eq!(track.clip_at_time(4.999), Some(id));
        assert_eq!(track.clip_at_time(5.0), None);
        assert_eq!(track.clip_at_time(-1.0), None);
    }

    #[test]
    fn test_can_offset_clip_clamps_to_gap() {
        let track = wave_with_clips("T", &[(0.0, 1.0), (2.0, 5.0), (6.0, 8.0)]);
        let a = track.clips()[1].id;

        // Requested +2.0 must shrink to +1.0 (right edge meets 6.0)
        let allowed = track.can_offset_clip(a, 2.0, &[]).unwrap();
        assert_eq!(allowed, 1.0);

        // Leftwards only 1.0 second is free before the clip at [0, 1)
        let allowed = track.can_offset_clip(a, -3.0, &[]).unwrap();
        assert_eq!(allowed, -1.0);

        // Within the gap the request passes through unchanged
        let allowed = track.can_offset_clip(a, 0.5, &[]).unwrap();
        assert_eq!(allowed, 0.5);
    }

    #[test]
    fn test_can_offset_clip_ignores_group_members() {
        let track = wave_with_clips("T", &[(2.0, 5.0), (5.0, 7.0)]);
        let a = track.clips()[0].id;
        let b = track.clips()[1].id;

        // b blocks a completely...
        assert_eq!(track.can_offset_clip(a, 1.0, &[]).unwrap(), 0.0);
        // ...unless b moves with a
        assert_eq!(track.can_offset_clip(a, 1.0, &[b]).unwrap(), 1.0);
    }

    #[test]
    fn test_can_insert_clip_tolerance_nudge() {
        let track = wave_with_clips("T", &[(4.0, 6.0)]);
        let clip = Clip::from_span("C", 0.0, 2.0, 44_100.0);

        // Clean fit
        let (mut delta, mut tol) = (1.0, 0.1);
        assert!(track.can_insert_clip(&clip, &mut delta, &mut tol));
        assert_eq!(delta, 1.0);

        // Slight overlap on the trailing edge is nudged out
        let (mut delta, mut tol) = (2.05, 0.1);
        assert!(track.can_insert_clip(&clip, &mut delta, &mut tol));
        assert!((delta - 2.0).abs() < 1e-9);
        assert!(tol < 0.001); // tolerance spent

        // Overlap beyond tolerance is rejected
        let (mut delta, mut tol) = (3.0, 0.1);
        assert!(!track.can_insert_clip(&clip, &mut delta, &mut tol));
    }

    #[test]
    fn test_remove_and_add_clip() {
        let mut track = wave_with_clips("T", &[(0.0, 1.0), (2.0, 3.0)]);
        let id = track.clips()[0].id;

        let owned = track.remove_clip(id).unwrap();
        assert_eq!(track.clips().len(), 1);
        assert!(track.clip(id).is_none());

        track.add_clip(owned).unwrap();
        assert_eq!(track.clips().len(), 2);
        assert!(track.clips_non_overlapping());
    }

    #[test]
    fn test_label_track_moves_as_whole() {
        let mut track = Track::label("Markers", TimeSpan::new(1.0, 4.0));
        assert!(!track.kind.supports_clips());
        track.offset(0.5);
        assert_eq!(track.start_time(), 1.5);
        assert_eq!(track.end_time(), 4.5);
        assert!(track.remove_clip(ClipId(999)).is_err());
    }
}
