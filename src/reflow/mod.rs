//! Display geometry fitting and debounced viewport reflow.

use std::time::{Duration, Instant};

use crate::geometry::{DisplayPoint, DisplaySize, ImageGeometry, NativeSize};

pub const DEFAULT_FIT_MARGIN: f64 = 20.0;
pub const DEFAULT_REFLOW_DEBOUNCE: Duration = Duration::from_millis(150);

/// Fits the image into the container, centered, inside `margin` on every side.
/// Images are never upscaled past their native size.
pub fn fit_image(native: NativeSize, container: DisplaySize, margin: f64) -> ImageGeometry {
    if native.is_empty() || container.is_empty() {
        return ImageGeometry::new(native, DisplaySize::new(0.0, 0.0), DisplayPoint::default());
    }
    let available_width = (container.width - 2.0 * margin).max(0.0);
    let available_height = (container.height - 2.0 * margin).max(0.0);
    let native_width = f64::from(native.width);
    let native_height = f64::from(native.height);
    let scale = (available_width / native_width)
        .min(available_height / native_height)
        .min(1.0);
    let display = DisplaySize::new(native_width * scale, native_height * scale);
    let origin = DisplayPoint::new(
        (container.width - display.width) / 2.0,
        (container.height - display.height) / 2.0,
    );
    ImageGeometry::new(native, display, origin)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingResize {
    viewport: DisplaySize,
    deadline: Instant,
}

/// Coalesces bursts of viewport size events into one recomputation.
#[derive(Debug, Clone)]
pub struct ReflowDebouncer {
    quiet_period: Duration,
    pending: Option<PendingResize>,
}

impl ReflowDebouncer {
    pub const fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    pub fn request(&mut self, viewport: DisplaySize, now: Instant) {
        let coalesced = self.pending.is_some();
        self.pending = Some(PendingResize {
            viewport,
            deadline: now + self.quiet_period,
        });
        tracing::trace!(
            width = viewport.width,
            height = viewport.height,
            coalesced,
            "viewport resize queued"
        );
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.deadline)
    }

    /// Returns the latest viewport once the quiet period has passed.
    pub fn poll(&mut self, now: Instant) -> Option<DisplaySize> {
        match self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending = None;
                Some(pending.viewport)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Geometry before and after one recomputation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflow {
    pub previous: Option<ImageGeometry>,
    pub current: ImageGeometry,
}

/// Owner of the current display geometry.
#[derive(Debug, Clone)]
pub struct ReflowManager {
    margin: f64,
    native: Option<NativeSize>,
    viewport: Option<DisplaySize>,
    geometry: Option<ImageGeometry>,
    debouncer: ReflowDebouncer,
}

impl ReflowManager {
    pub fn new(margin: f64, quiet_period: Duration) -> Self {
        Self {
            margin,
            native: None,
            viewport: None,
            geometry: None,
            debouncer: ReflowDebouncer::new(quiet_period),
        }
    }

    pub fn geometry(&self) -> Option<&ImageGeometry> {
        self.geometry.as_ref()
    }

    pub fn viewport(&self) -> Option<DisplaySize> {
        self.viewport
    }

    pub fn has_pending_resize(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Installs a newly decoded image and fits it to the known viewport.
    pub fn set_image(&mut self, native: NativeSize) -> Option<Reflow> {
        self.native = Some(native);
        self.geometry = None;
        self.recompute()
    }

    pub fn clear_image(&mut self) {
        self.native = None;
        self.geometry = None;
    }

    /// Applies a viewport size immediately, bypassing the debounce.
    pub fn resize_now(&mut self, viewport: DisplaySize) -> Option<Reflow> {
        self.debouncer.cancel();
        self.viewport = Some(viewport);
        self.recompute()
    }

    pub fn request_resize(&mut self, viewport: DisplaySize, now: Instant) {
        self.debouncer.request(viewport, now);
    }

    /// Runs the queued resize if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Reflow> {
        let viewport = self.debouncer.poll(now)?;
        self.viewport = Some(viewport);
        self.recompute()
    }

    fn recompute(&mut self) -> Option<Reflow> {
        let native = self.native?;
        let viewport = self.viewport?;
        let current = fit_image(native, viewport, self.margin);
        let previous = self.geometry.replace(current);
        tracing::debug!(
            native_width = native.width,
            native_height = native.height,
            display_width = current.display().width,
            display_height = current.display().height,
            "display geometry recomputed"
        );
        Some(Reflow { previous, current })
    }
}

impl Default for ReflowManager {
    fn default() -> Self {
        Self::new(DEFAULT_FIT_MARGIN, DEFAULT_REFLOW_DEBOUNCE)
    }
}
