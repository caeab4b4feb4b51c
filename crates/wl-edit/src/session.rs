//! Drag session controller
//!
//! Owns the mutable state of one pointer drag and orchestrates the
//! capture, snap, horizontal and vertical resolvers across the
//! pointer-down / pointer-move / pointer-up / cancel sequence. Every
//! rejection below the transport guard is resolved here; callers only
//! ever see a refresh directive.

use log::debug;

use wl_core::{TrackId, TrackKind};

use crate::{
    ClipMoveState, EditResult, History, Project, SnapIndex, UndoPush, Viewport,
    build_capture_set,
    slide::{do_offset, do_slide_horizontal},
    snap::find_desired_slide,
    vertical::{VerticalMove, try_slide_vertical},
};

/// Drag handle width at a cell edge, including border and margin
const DRAG_HANDLE_WIDTH: f64 = 14.0;
/// The cursor hotspot is not at its centre
const HOTSPOT_OFFSET: f64 = 5.0;

/// What the caller should repaint after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshKind {
    #[default]
    None,
    Cell,
    All,
}

/// Event outcome handed back to the windowing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Refresh {
    pub kind: RefreshKind,
    /// The operation was refused or the session was unwound
    pub cancelled: bool,
    /// Scroll range must be recomputed after a commit
    pub fix_scrollbars: bool,
}

impl Refresh {
    pub const NONE: Self = Self {
        kind: RefreshKind::None,
        cancelled: false,
        fix_scrollbars: false,
    };
    pub const ALL: Self = Self {
        kind: RefreshKind::All,
        cancelled: false,
        fix_scrollbars: false,
    };
    pub const CANCELLED: Self = Self {
        kind: RefreshKind::None,
        cancelled: true,
        fix_scrollbars: false,
    };
}

/// Drag session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Capturing,
    Dragging,
    Committed,
    RolledBack,
}

/// Pointer state delivered by the windowing layer
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerEvent {
    /// Pixel column within the track area
    pub x: f64,
    /// Track under the pointer, if any
    pub track: Option<TrackId>,
    /// Whole-track shift modifier (shift key)
    pub shift: bool,
    /// Vertical-only modifier (ctrl/cmd)
    pub ctrl: bool,
}

/// Mouse cursor for the drag area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    TimeSlide,
    Disabled,
}

/// Message and cursor for the hover preview
#[derive(Debug, Clone, Copy)]
pub struct HitPreview {
    pub message: &'static str,
    pub cursor: Cursor,
}

/// Hover preview for the time-shift tool; disabled while audio is active
pub fn hit_preview(audio_active: bool) -> HitPreview {
    HitPreview {
        message: "Click and drag to move a track in time",
        cursor: if audio_active {
            Cursor::Disabled
        } else {
            Cursor::TimeSlide
        },
    }
}

/// Whether the pointer landed on one of the two edge grips of a cell
pub fn hit_test(x: f64, cell_left: f64, cell_width: f64) -> bool {
    let x = x + HOTSPOT_OFFSET;
    x < cell_left + DRAG_HANDLE_WIDTH || x >= cell_left + cell_width - DRAG_HANDLE_WIDTH
}

/// One pointer drag from pointer-down to pointer-up or cancel
#[derive(Default)]
pub struct DragSession {
    phase: DragPhase,
    state: ClipMoveState,
    captured_track: Option<TrackId>,
    snap_index: SnapIndex,
    snap_prefer_right: bool,
    vertical_only: bool,
    moved_vertically: bool,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn moved_vertically(&self) -> bool {
        self.moved_vertically
    }

    /// Snap indicator pixel positions (left edge, right edge) for the
    /// guideline overlay; at most one is ever set
    pub fn snap_guides(&self) -> (Option<f64>, Option<f64>) {
        (self.state.snap_left, self.state.snap_right)
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, DragPhase::Capturing | DragPhase::Dragging)
    }

    /// Begin a drag. Refused while audio is active and when the pointer
    /// did not land on a draggable clip or track region.
    pub fn pointer_down(
        &mut self,
        project: &Project,
        viewport: &Viewport,
        ev: PointerEvent,
    ) -> EditResult<Refresh> {
        if project.is_audio_active() {
            return Ok(Refresh::CANCELLED);
        }
        let Some(track_id) = ev.track else {
            return Ok(Refresh::CANCELLED);
        };
        let track = project.tracks.track(track_id)?;

        self.state.clear();
        self.moved_vertically = false;
        self.vertical_only = ev.ctrl;
        self.captured_track = Some(track_id);

        let click_time = viewport.time_at(ev.x);
        self.state.captured_is_selection =
            track.selected && project.selection_contains(click_time);

        let grabs_clip =
            matches!(track.kind, TrackKind::Wave { .. } | TrackKind::Note { .. }) && !ev.shift;
        if grabs_clip {
            if track.kind.supports_clips() {
                let Some(clip) = track.clip_at_time(click_time) else {
                    // No clip under the pointer: nothing to drag
                    return Ok(Refresh::CANCELLED);
                };
                self.state.captured_clip = Some(clip);
            } else {
                self.state.captured_clip = None;
            }
            build_capture_set(&mut self.state, project, track_id, click_time)?;
        } else {
            // Shift was down, or the track holds no clips: the whole
            // track (and its stereo partner) becomes the unit of
            // movement, so neither may serve as a snap target
            self.state.captured_clip = None;
            self.state.entries.clear();
            self.state.mark_excluded(track_id);
            if let Some(partner) = project.tracks.partner_of(track_id) {
                self.state.mark_excluded(partner);
            }
        }

        self.state.click_x = ev.x;
        self.state.clear_snap();
        self.snap_index = SnapIndex::new(project, &self.state);
        self.snap_prefer_right = match self.state.captured_clip.and_then(|id| track.clip(id)) {
            Some(clip) => {
                (click_time - clip.end()).abs() < (click_time - clip.start).abs()
            }
            None => false,
        };

        self.phase = DragPhase::Capturing;
        Ok(Refresh::NONE)
    }

    /// Apply one pointer movement: undo the previous slide, resolve the
    /// new delta through snapping, the vertical validator and the
    /// horizontal resolver, and apply it.
    pub fn pointer_move(
        &mut self,
        project: &mut Project,
        history: &History,
        viewport: &Viewport,
        ev: PointerEvent,
    ) -> EditResult<Refresh> {
        if !self.is_active() {
            return Ok(Refresh::NONE);
        }
        if project.is_audio_active() {
            let refresh = self.cancel(project, history)?;
            return Ok(Refresh {
                cancelled: true,
                ..refresh
            });
        }
        let Some(captured_id) = self.captured_track else {
            return Ok(Refresh::NONE);
        };

        // Track under the pointer; while x stays inside the track area a
        // pointer that left every row keeps dragging the captured track
        let pointer_track = ev
            .track
            .filter(|&id| project.tracks.get(id).is_some())
            .or_else(|| viewport.contains_x(ev.x).then_some(captured_id));
        let Some(pointer_track) = pointer_track else {
            return Ok(Refresh::NONE);
        };

        self.phase = DragPhase::Dragging;

        // Everything is computed relative to the committed baseline:
        // undo the cumulative slide first
        do_offset(
            &self.state,
            &mut project.tracks,
            Some(captured_id),
            -self.state.h_slide,
        )?;
        if self.state.captured_is_selection {
            project.move_selection(-self.state.h_slide);
        }
        self.state.h_slide = 0.0;

        let mut desired = find_desired_slide(
            &mut self.state,
            project,
            viewport,
            &self.snap_index,
            captured_id,
            ev.x,
            self.vertical_only,
            self.snap_prefer_right,
        )?;

        // Crossing into another audio row moves the group vertically
        let mut slid_vertically = false;
        if self.state.captured_clip.is_some()
            && pointer_track != captured_id
            && project.tracks.track(pointer_track)?.kind.supports_clips()
            && project.tracks.audio_row_of(pointer_track)
                != project.tracks.audio_row_of(captured_id)
        {
            let tolerance = viewport.time_per_pixel();
            match try_slide_vertical(
                &mut self.state,
                &mut project.tracks,
                captured_id,
                pointer_track,
                &mut desired,
                tolerance,
            )? {
                VerticalMove::Moved => {
                    self.captured_track = Some(pointer_track);
                    self.moved_vertically = true;
                    // New baseline: the slide applied below becomes the
                    // new zero
                    self.state.click_x = ev.x;
                    slid_vertically = true;
                }
                VerticalMove::Rejected => {
                    // Horizontal-only continuation below
                }
            }
        }

        if desired != 0.0 {
            self.state.h_slide = desired;
            let anchor = self.captured_track.unwrap_or(captured_id);
            do_slide_horizontal(&mut self.state, &mut project.tracks, anchor)?;
            if self.state.captured_is_selection {
                project.move_selection(self.state.h_slide);
            }
        }

        if slid_vertically {
            self.state.h_slide = 0.0;
        }

        Ok(Refresh::ALL)
    }

    /// Finish the drag: resample clips that changed track and push one
    /// named history entry describing the move.
    pub fn pointer_up(
        &mut self,
        project: &mut Project,
        history: &mut History,
    ) -> EditResult<Refresh> {
        if !self.is_active() {
            return Ok(Refresh::NONE);
        }
        if project.is_audio_active() {
            let refresh = self.cancel(project, history)?;
            return Ok(Refresh {
                cancelled: true,
                ..refresh
            });
        }

        let mut refresh = Refresh::NONE;
        // Guide lines disappear on release
        if self.state.snap_left.is_some() || self.state.snap_right.is_some() {
            self.state.clear_snap();
            refresh = Refresh::ALL;
        }

        if !self.moved_vertically && self.state.h_slide == 0.0 {
            self.phase = DragPhase::Committed;
            return Ok(refresh);
        }

        // A clip dropped on another track must match its new rate
        for entry in &self.state.entries {
            let Some(clip_id) = entry.clip else {
                continue;
            };
            if entry.track == entry.origin_track {
                continue;
            }
            let Some(rate) = project.tracks.track(entry.track)?.rate() else {
                continue;
            };
            if let Some(clip) = project.tracks.track_mut(entry.track)?.clip_mut(clip_id) {
                clip.resample(rate);
            }
        }

        let (message, mode) = if self.moved_vertically {
            (
                "Moved clips to another track".to_string(),
                UndoPush::Autosave,
            )
        } else if self.state.h_slide > 0.0 {
            (
                format!(
                    "Time shifted tracks/clips right {:.2} seconds",
                    self.state.h_slide
                ),
                UndoPush::Consolidate,
            )
        } else {
            (
                format!(
                    "Time shifted tracks/clips left {:.2} seconds",
                    self.state.h_slide.abs()
                ),
                UndoPush::Consolidate,
            )
        };
        history.push(project, &message, "Time-Shift", mode)?;
        debug!("drag committed: {message}");

        self.phase = DragPhase::Committed;
        refresh.kind = RefreshKind::All;
        refresh.fix_scrollbars = true;
        Ok(refresh)
    }

    /// Abort the drag, restoring the last committed state. Cancelling
    /// with no active session is a no-op.
    pub fn cancel(&mut self, project: &mut Project, history: &History) -> EditResult<Refresh> {
        if !self.is_active() {
            return Ok(Refresh::NONE);
        }
        history.rollback(project)?;
        self.state.clear();
        self.phase = DragPhase::RolledBack;
        debug!("drag cancelled; project rolled back");
        Ok(Refresh::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_preview_reflects_guard() {
        assert_eq!(hit_preview(false).cursor, Cursor::TimeSlide);
        assert_eq!(hit_preview(true).cursor, Cursor::Disabled);
    }

    #[test]
    fn test_hit_test_grips() {
        // Cell from x=100, 200 wide: grips at both edges
        assert!(hit_test(100.0, 100.0, 200.0));
        assert!(hit_test(290.0, 100.0, 200.0));
        assert!(!hit_test(200.0, 100.0, 200.0)); // middle of the cell
    }

    #[test]
    fn test_refresh_constants() {
        assert_eq!(Refresh::ALL.kind, RefreshKind::All);
        assert!(!Refresh::ALL.cancelled);
        assert!(Refresh::CANCELLED.cancelled);
        assert_eq!(Refresh::CANCELLED.kind, RefreshKind::None);
    }
}
