use crate::crop::{solver, to_display, to_native, CropConstraints};
use crate::geometry::{CropTargets, DisplayRect, ImageGeometry, NativeRect, Orientation};

use super::error::{SessionError, SessionResult};
use super::{event::StageTransition, Stage, StageEvent};

/// Geometry and configuration a stage change needs to (re)derive rectangles.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub geometry: &'a ImageGeometry,
    pub targets: &'a CropTargets,
    pub min_crop_size: f64,
}

impl<'a> StageContext<'a> {
    pub const fn new(
        geometry: &'a ImageGeometry,
        targets: &'a CropTargets,
        min_crop_size: f64,
    ) -> Self {
        Self {
            geometry,
            targets,
            min_crop_size,
        }
    }

    pub fn constraints(&self, orientation: Orientation) -> CropConstraints {
        CropConstraints::new(
            self.geometry.display(),
            self.targets.ratio(orientation),
            self.min_crop_size,
        )
    }

    fn ensure_geometry(&self) -> SessionResult<()> {
        if self.geometry.is_degenerate() {
            return Err(SessionError::GeometryUnavailable);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct OrientationCrop {
    stored: NativeRect,
    display: Option<DisplayRect>,
}

/// Portrait → landscape → review workflow for one selected image.
#[derive(Debug)]
pub struct CropSession {
    identifier: String,
    stage: Stage,
    portrait: OrientationCrop,
    landscape: OrientationCrop,
    transition_history: Vec<StageTransition>,
}

impl CropSession {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self::with_crops(identifier, NativeRect::ZERO, NativeRect::ZERO)
    }

    /// Session seeded with previously persisted crops.
    pub fn with_crops(
        identifier: impl Into<String>,
        portrait: NativeRect,
        landscape: NativeRect,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            stage: Stage::Portrait,
            portrait: OrientationCrop {
                stored: portrait,
                display: None,
            },
            landscape: OrientationCrop {
                stored: landscape,
                display: None,
            },
            transition_history: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn crop(&self, orientation: Orientation) -> NativeRect {
        self.slot(orientation).stored
    }

    pub fn display_rect(&self, orientation: Orientation) -> Option<DisplayRect> {
        self.slot(orientation).display
    }

    /// Rectangle shown for the active stage, if it has one.
    pub fn active_display_rect(&self) -> Option<DisplayRect> {
        self.stage
            .orientation()
            .and_then(|orientation| self.display_rect(orientation))
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transition_history
    }

    fn slot(&self, orientation: Orientation) -> &OrientationCrop {
        match orientation {
            Orientation::Portrait => &self.portrait,
            Orientation::Landscape => &self.landscape,
        }
    }

    fn slot_mut(&mut self, orientation: Orientation) -> &mut OrientationCrop {
        match orientation {
            Orientation::Portrait => &mut self.portrait,
            Orientation::Landscape => &mut self.landscape,
        }
    }

    pub fn can_transition(&self, event: StageEvent) -> bool {
        self.next_stage(event).is_some()
    }

    pub fn next_stage(&self, event: StageEvent) -> Option<Stage> {
        use StageEvent::*;
        match (self.stage, event) {
            (Stage::Portrait, Advance | Skip) => Some(Stage::Landscape),
            (Stage::Landscape, Advance | Skip) => Some(Stage::Review),
            (Stage::Landscape, Back) => Some(Stage::Portrait),
            (Stage::Review, Back) => Some(Stage::Landscape),
            (Stage::Review, Redirect) => Some(Stage::Portrait),
            (_, Reset) => Some(Stage::Portrait),
            _ => None,
        }
    }

    fn checked_next(&self, event: StageEvent) -> SessionResult<Stage> {
        self.next_stage(event).ok_or_else(|| {
            let from = self.stage;
            tracing::warn!(from = ?from, event = ?event, "invalid stage transition requested");
            SessionError::InvalidStageTransition { from, event }
        })
    }

    fn apply(&mut self, event: StageEvent, next: Stage) {
        tracing::debug!(
            identifier = %self.identifier,
            from = ?self.stage,
            ?event,
            to = ?next,
            "stage transition"
        );
        self.transition_history
            .push(StageTransition::new(self.stage, event, next));
        self.stage = next;
    }

    /// Derives the visible rectangle for the current stage: the stored crop if
    /// one exists, otherwise a centered default. Review without any crop is
    /// sent back to portrait.
    pub fn enter_stage(
        &mut self,
        context: &StageContext<'_>,
    ) -> SessionResult<Option<DisplayRect>> {
        context.ensure_geometry()?;
        let nothing_captured = self.portrait.stored.is_zero() && self.landscape.stored.is_zero();
        if self.stage == Stage::Review && nothing_captured {
            // TODO: review is only reachable empty via two skips; decide whether
            // the skip buttons should refuse the second skip instead.
            tracing::info!(
                identifier = %self.identifier,
                "review has no crops; redirecting to portrait"
            );
            self.apply(StageEvent::Redirect, Stage::Portrait);
        }
        let Some(orientation) = self.stage.orientation() else {
            return Ok(None);
        };
        let constraints = context.constraints(orientation);
        let slot = self.slot_mut(orientation);
        let rect = if slot.stored.is_zero() {
            solver::default_rect(&constraints)
        } else {
            solver::constrain(to_display(slot.stored, context.geometry), &constraints)
        };
        slot.display = Some(rect);
        Ok(Some(rect))
    }

    /// Stores a released gesture rectangle for the active orientation.
    pub fn commit_display_rect(&mut self, rect: DisplayRect) -> bool {
        let Some(orientation) = self.stage.orientation() else {
            return false;
        };
        self.slot_mut(orientation).display = Some(rect);
        true
    }

    /// Converts the active orientation's displayed rectangle to native space
    /// and stores it. Calling it again without an edit in between yields the
    /// same crop.
    pub fn capture(
        &mut self,
        context: &StageContext<'_>,
    ) -> SessionResult<Option<(Orientation, NativeRect)>> {
        context.ensure_geometry()?;
        let Some(orientation) = self.stage.orientation() else {
            return Ok(None);
        };
        let constraints = context.constraints(orientation);
        let slot = self.slot_mut(orientation);
        let display = slot
            .display
            .unwrap_or_else(|| solver::default_rect(&constraints));
        let native = to_native(display, context.geometry);
        if native.is_zero() {
            return Err(SessionError::GeometryUnavailable);
        }
        slot.display = Some(display);
        slot.stored = native;
        Ok(Some((orientation, native)))
    }

    pub fn advance(&mut self, context: &StageContext<'_>) -> SessionResult<Stage> {
        let next = self.checked_next(StageEvent::Advance)?;
        context.ensure_geometry()?;
        self.capture(context)?;
        self.apply(StageEvent::Advance, next);
        self.enter_stage(context)?;
        Ok(self.stage)
    }

    pub fn skip(&mut self, context: &StageContext<'_>) -> SessionResult<Stage> {
        let next = self.checked_next(StageEvent::Skip)?;
        context.ensure_geometry()?;
        if let Some(orientation) = self.stage.orientation() {
            *self.slot_mut(orientation) = OrientationCrop::default();
        }
        self.apply(StageEvent::Skip, next);
        self.enter_stage(context)?;
        Ok(self.stage)
    }

    pub fn back(&mut self, context: &StageContext<'_>) -> SessionResult<Stage> {
        let next = self.checked_next(StageEvent::Back)?;
        context.ensure_geometry()?;
        self.apply(StageEvent::Back, next);
        self.enter_stage(context)?;
        Ok(self.stage)
    }

    pub fn reset(&mut self, context: &StageContext<'_>) -> SessionResult<Stage> {
        context.ensure_geometry()?;
        self.portrait = OrientationCrop::default();
        self.landscape = OrientationCrop::default();
        self.apply(StageEvent::Reset, Stage::Portrait);
        self.enter_stage(context)?;
        Ok(self.stage)
    }

    /// Re-derives the active rectangle after the display geometry changed.
    ///
    /// An edit that has not been captured yet is carried over through native
    /// space using the geometry it was drawn against.
    pub fn reproject(
        &mut self,
        previous: Option<&ImageGeometry>,
        context: &StageContext<'_>,
    ) -> SessionResult<Option<DisplayRect>> {
        context.ensure_geometry()?;
        let Some(orientation) = self.stage.orientation() else {
            return Ok(None);
        };
        let constraints = context.constraints(orientation);
        let slot = self.slot_mut(orientation);
        let working = match (slot.display, previous) {
            (Some(rect), Some(previous)) if !previous.is_degenerate() => {
                to_native(rect, previous)
            }
            _ => slot.stored,
        };
        let rect = if working.is_zero() {
            solver::default_rect(&constraints)
        } else {
            solver::constrain(to_display(working, context.geometry), &constraints)
        };
        slot.display = Some(rect);
        Ok(Some(rect))
    }
}

impl std::fmt::Display for CropSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at Stage::{:?}", self.identifier, self.stage)
    }
}
