use std::time::{Duration, Instant};

use crate::crop::gesture::HANDLE_HIT_RADIUS;
use crate::crop::{
    hit_test, CropConstraints, CropMask, GestureController, GestureFrame, GestureKind,
};
use crate::error::AppResult;
use crate::geometry::{
    CropTargets, DisplayPoint, DisplayRect, DisplaySize, ImageGeometry, NativeRect, NativeSize,
    Orientation,
};
use crate::notification::Notifier;
use crate::reflow::{Reflow, ReflowManager, DEFAULT_FIT_MARGIN, DEFAULT_REFLOW_DEBOUNCE};
use crate::render::ImageSource;
use crate::session::{CropSession, SessionError, Stage, StageContext, StageEvent};
use crate::storage::{CropPersistence, StorageError};

use super::activity::{Activity, ActivityEvent, ActivityToken};
use super::error::{CoordinatorError, CoordinatorResult};

/// Process-wide crop parameters, fixed at start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    pub targets: CropTargets,
    pub min_crop_size: f64,
    pub fit_margin: f64,
    pub reflow_debounce: Duration,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            targets: CropTargets::default(),
            min_crop_size: crate::crop::MIN_CROP_SIZE,
            fit_margin: DEFAULT_FIT_MARGIN,
            reflow_debounce: DEFAULT_REFLOW_DEBOUNCE,
        }
    }
}

/// Stamp handed out when an image load starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    identifier: String,
    generation: u64,
}

impl SelectionTicket {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTicket {
    generation: u64,
}

/// Outcome of an asynchronous continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The ticket was superseded; nothing changed.
    Stale,
}

pub struct Coordinator<P, N> {
    settings: CropSettings,
    persistence: P,
    notifier: N,
    activity: ActivityToken,
    selection_generation: u64,
    sync_generation: u64,
    session: Option<CropSession>,
    reflow: ReflowManager,
    gesture: GestureController,
}

impl<P: CropPersistence, N: Notifier> Coordinator<P, N> {
    pub fn new(settings: CropSettings, persistence: P, notifier: N) -> Self {
        Self {
            settings,
            persistence,
            notifier,
            activity: ActivityToken::new(),
            selection_generation: 0,
            sync_generation: 0,
            session: None,
            reflow: ReflowManager::new(settings.fit_margin, settings.reflow_debounce),
            gesture: GestureController::new(),
        }
    }

    pub fn settings(&self) -> &CropSettings {
        &self.settings
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn activity(&self) -> Activity {
        self.activity.activity()
    }

    pub fn session(&self) -> Option<&CropSession> {
        self.session.as_ref()
    }

    pub fn geometry(&self) -> Option<&ImageGeometry> {
        self.reflow.geometry()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.session.as_ref().map(CropSession::stage)
    }

    pub fn active_rect(&self) -> Option<DisplayRect> {
        self.session.as_ref()?.active_display_rect()
    }

    /// Shaded regions around the committed rectangle.
    pub fn crop_mask(&self) -> Option<CropMask> {
        let geometry = self.reflow.geometry()?;
        Some(CropMask::around(self.active_rect()?, geometry.display()))
    }

    /// When the caller should next invoke [`Coordinator::tick`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.reflow.next_deadline()
    }

    fn context<'a>(&'a self, geometry: &'a ImageGeometry) -> StageContext<'a> {
        StageContext::new(geometry, &self.settings.targets, self.settings.min_crop_size)
    }

    fn active_constraints(&self) -> Option<CropConstraints> {
        let geometry = self.reflow.geometry()?;
        let orientation = self.session.as_ref()?.stage().orientation()?;
        Some(self.context(geometry).constraints(orientation))
    }

    pub fn begin_selection(&mut self, identifier: &str) -> CoordinatorResult<SelectionTicket> {
        self.activity.transition(ActivityEvent::BeginSelection)?;
        self.selection_generation = self.selection_generation.wrapping_add(1);
        self.session = None;
        self.gesture.cancel();
        self.reflow.clear_image();
        tracing::info!(
            identifier,
            generation = self.selection_generation,
            "image selection started"
        );
        Ok(SelectionTicket {
            identifier: identifier.to_string(),
            generation: self.selection_generation,
        })
    }

    fn is_current_selection(&self, ticket: &SelectionTicket) -> bool {
        self.activity() == Activity::Selecting && ticket.generation == self.selection_generation
    }

    /// Installs the decoded image and its saved crops, then enters the first
    /// stage once display geometry is known.
    pub fn complete_selection(
        &mut self,
        ticket: &SelectionTicket,
        native: NativeSize,
    ) -> AppResult<Completion> {
        if !self.is_current_selection(ticket) {
            tracing::debug!(
                identifier = ticket.identifier(),
                generation = ticket.generation,
                "stale selection completion ignored"
            );
            return Ok(Completion::Stale);
        }
        self.activity.transition(ActivityEvent::FinishSelection)?;
        if native.is_empty() {
            tracing::warn!(
                identifier = ticket.identifier(),
                "image has no usable dimensions"
            );
            return Err(SessionError::GeometryUnavailable.into());
        }

        let portrait = self.fetch_saved(ticket.identifier(), Orientation::Portrait);
        let landscape = self.fetch_saved(ticket.identifier(), Orientation::Landscape);
        self.session = Some(CropSession::with_crops(
            ticket.identifier(),
            portrait,
            landscape,
        ));
        if let Some(reflow) = self.reflow.set_image(native) {
            self.apply_reflow(reflow)?;
        }
        tracing::info!(
            identifier = ticket.identifier(),
            width = native.width,
            height = native.height,
            "image selected"
        );
        Ok(Completion::Applied)
    }

    /// Gives up on a pending load, e.g. after the asset failed to decode.
    pub fn abandon_selection(&mut self, ticket: &SelectionTicket) -> Completion {
        if !self.is_current_selection(ticket) {
            return Completion::Stale;
        }
        match self.activity.transition(ActivityEvent::FinishSelection) {
            Ok(_) => {
                tracing::info!(identifier = ticket.identifier(), "image selection abandoned");
                Completion::Applied
            }
            Err(_) => Completion::Stale,
        }
    }

    /// Begins a selection and completes it with dimensions from `source`.
    pub fn select_image(
        &mut self,
        identifier: &str,
        source: &dyn ImageSource,
    ) -> AppResult<Completion> {
        let ticket = self.begin_selection(identifier)?;
        match source.resolve_native_dimensions(identifier) {
            Ok(native) => self.complete_selection(&ticket, native),
            Err(err) => {
                tracing::warn!(identifier, %err, "failed to resolve image dimensions");
                self.abandon_selection(&ticket);
                Err(err.into())
            }
        }
    }

    fn fetch_saved(&self, identifier: &str, orientation: Orientation) -> NativeRect {
        match self.persistence.fetch_crop(identifier, orientation) {
            Ok(Some(rect)) => rect,
            Ok(None) => NativeRect::ZERO,
            Err(err) => {
                report_persistence_failure(
                    &self.notifier,
                    &format!("Could not load the saved {orientation} crop for {identifier}"),
                    &err,
                );
                NativeRect::ZERO
            }
        }
    }

    pub fn begin_sync(&mut self) -> CoordinatorResult<SyncTicket> {
        self.activity.transition(ActivityEvent::BeginSync)?;
        self.sync_generation = self.sync_generation.wrapping_add(1);
        tracing::info!(generation = self.sync_generation, "library sync started");
        Ok(SyncTicket {
            generation: self.sync_generation,
        })
    }

    pub fn finish_sync(&mut self, ticket: SyncTicket) -> Completion {
        if self.activity() != Activity::Syncing || ticket.generation != self.sync_generation {
            tracing::debug!(generation = ticket.generation, "stale sync completion ignored");
            return Completion::Stale;
        }
        match self.activity.transition(ActivityEvent::FinishSync) {
            Ok(_) => {
                tracing::info!(generation = ticket.generation, "library sync finished");
                Completion::Applied
            }
            Err(_) => Completion::Stale,
        }
    }

    /// Applies a viewport size right away, e.g. for the first layout pass.
    pub fn resize_viewport(&mut self, viewport: DisplaySize) -> AppResult<Option<DisplayRect>> {
        if !self.activity.allows_reflow() {
            return Err(CoordinatorError::Busy {
                activity: self.activity(),
                operation: "viewport resize",
            }
            .into());
        }
        match self.reflow.resize_now(viewport) {
            Some(reflow) => self.apply_reflow(reflow),
            None => Ok(None),
        }
    }

    /// Queues a viewport size; it is applied by [`Coordinator::tick`] once the
    /// quiet period has passed.
    pub fn request_viewport_resize(&mut self, viewport: DisplaySize, now: Instant) {
        self.reflow.request_resize(viewport, now);
    }

    /// Runs a due reflow. Returns the new active rectangle if one was applied.
    pub fn tick(&mut self, now: Instant) -> AppResult<Option<DisplayRect>> {
        if !self.activity.allows_reflow() {
            if self.reflow.has_pending_resize() {
                tracing::trace!(activity = ?self.activity(), "reflow deferred");
            }
            return Ok(None);
        }
        match self.reflow.poll(now) {
            Some(reflow) => self.apply_reflow(reflow),
            None => Ok(None),
        }
    }

    fn apply_reflow(&mut self, reflow: Reflow) -> AppResult<Option<DisplayRect>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        if reflow.current.is_degenerate() {
            tracing::debug!("display geometry degenerate; crop update deferred");
            return Ok(None);
        }
        let context = StageContext::new(
            &reflow.current,
            &self.settings.targets,
            self.settings.min_crop_size,
        );
        let previous = reflow
            .previous
            .filter(|previous| !previous.is_degenerate());
        let rect = match previous {
            Some(previous) if session.active_display_rect().is_some() => {
                session.reproject(Some(&previous), &context)?
            }
            _ => session.enter_stage(&context)?,
        };
        Ok(rect)
    }

    /// Starts a move or resize if `container_point` hits the crop rectangle.
    /// A press while a gesture is already running is ignored.
    pub fn pointer_down(
        &mut self,
        container_point: DisplayPoint,
    ) -> CoordinatorResult<Option<GestureKind>> {
        if self.activity() == Activity::Gesturing {
            tracing::debug!("pointer press ignored; gesture in progress");
            return Ok(None);
        }
        self.activity.check(ActivityEvent::BeginGesture)?;
        let (Some(geometry), Some(rect)) = (self.reflow.geometry(), self.active_rect()) else {
            return Ok(None);
        };
        let point = geometry.to_image_point(container_point);
        let Some(kind) = hit_test(&rect, point, HANDLE_HIT_RADIUS) else {
            return Ok(None);
        };
        self.activity.transition(ActivityEvent::BeginGesture)?;
        self.gesture.begin(kind, point, rect);
        Ok(Some(kind))
    }

    pub fn pointer_move(&self, container_point: DisplayPoint) -> Option<GestureFrame> {
        let geometry = self.reflow.geometry()?;
        let constraints = self.active_constraints()?;
        self.gesture
            .update(geometry.to_image_point(container_point), &constraints)
    }

    /// Ends the gesture and commits the constrained rectangle.
    pub fn pointer_up(
        &mut self,
        container_point: DisplayPoint,
    ) -> CoordinatorResult<Option<DisplayRect>> {
        if self.activity() != Activity::Gesturing {
            return Ok(None);
        }
        let released = match (self.reflow.geometry(), self.active_constraints()) {
            (Some(geometry), Some(constraints)) => self
                .gesture
                .release(geometry.to_image_point(container_point), &constraints),
            _ => {
                self.gesture.cancel();
                None
            }
        };
        self.activity.end_gesture();
        if let (Some(rect), Some(session)) = (released, self.session.as_mut()) {
            session.commit_display_rect(rect);
        }
        Ok(released)
    }

    /// Drops the running gesture; the committed rectangle is left untouched.
    pub fn cancel_gesture(&mut self) -> Option<DisplayRect> {
        let start = self.gesture.cancel();
        self.activity.end_gesture();
        start
    }

    fn stage_geometry(&self, operation: &'static str) -> AppResult<ImageGeometry> {
        self.activity.ensure_idle(operation)?;
        if self.session.is_none() {
            return Err(CoordinatorError::NoActiveImage.into());
        }
        self.reflow
            .geometry()
            .copied()
            .filter(|geometry| !geometry.is_degenerate())
            .ok_or_else(|| SessionError::GeometryUnavailable.into())
    }

    /// Captures the current crop, submits it and moves to the next stage.
    ///
    /// A failed submit is reported through the notifier and returned; the
    /// captured crop stays in the session and the stage does not change, so
    /// calling `advance` again retries the submit.
    pub fn advance(&mut self) -> AppResult<Stage> {
        let geometry = self.stage_geometry("advance")?;
        let Self {
            session,
            settings,
            persistence,
            notifier,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return Err(CoordinatorError::NoActiveImage.into());
        };
        let context = StageContext::new(&geometry, &settings.targets, settings.min_crop_size);
        if session.can_transition(StageEvent::Advance) {
            if let Some((orientation, rect)) = session.capture(&context)? {
                if let Err(err) = persistence.submit_crop(session.identifier(), orientation, rect) {
                    report_persistence_failure(
                        notifier,
                        &format!(
                            "Failed to save the {orientation} crop for {}",
                            session.identifier()
                        ),
                        &err,
                    );
                    return Err(err.into());
                }
            }
        }
        Ok(session.advance(&context)?)
    }

    /// Moves on without saving the current orientation.
    pub fn skip(&mut self) -> AppResult<Stage> {
        let geometry = self.stage_geometry("skip")?;
        let context = StageContext::new(
            &geometry,
            &self.settings.targets,
            self.settings.min_crop_size,
        );
        let session = self.session.as_mut().ok_or(CoordinatorError::NoActiveImage)?;
        Ok(session.skip(&context)?)
    }

    pub fn back(&mut self) -> AppResult<Stage> {
        let geometry = self.stage_geometry("back")?;
        let context = StageContext::new(
            &geometry,
            &self.settings.targets,
            self.settings.min_crop_size,
        );
        let session = self.session.as_mut().ok_or(CoordinatorError::NoActiveImage)?;
        Ok(session.back(&context)?)
    }

    /// Clears both crops locally, then asks persistence to forget them.
    pub fn reset(&mut self) -> AppResult<Stage> {
        let geometry = self.stage_geometry("reset")?;
        let Self {
            session,
            settings,
            persistence,
            notifier,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return Err(CoordinatorError::NoActiveImage.into());
        };
        let context = StageContext::new(&geometry, &settings.targets, settings.min_crop_size);
        let stage = session.reset(&context)?;
        if let Err(err) = persistence.discard_crops(session.identifier()) {
            report_persistence_failure(
                notifier,
                &format!("Failed to discard saved crops for {}", session.identifier()),
                &err,
            );
            return Err(err.into());
        }
        Ok(stage)
    }
}

fn report_persistence_failure<N: Notifier>(notifier: &N, message: &str, err: &StorageError) {
    tracing::error!(%err, "{message}");
    notifier.notify(&format!("{message}: {err}"));
}
