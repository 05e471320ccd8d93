use crate::geometry::{DisplayPoint, DisplayRect, DisplaySize};

use super::solver::{self, CropConstraints, CropHandle};

pub const HANDLE_HIT_RADIUS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize(CropHandle),
}

/// The four shaded regions around the crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropMask {
    pub top: DisplayRect,
    pub bottom: DisplayRect,
    pub left: DisplayRect,
    pub right: DisplayRect,
}

impl CropMask {
    pub fn around(rect: DisplayRect, bounds: DisplaySize) -> Self {
        Self {
            top: DisplayRect::new(0.0, 0.0, bounds.width, rect.y.max(0.0)),
            bottom: DisplayRect::new(
                0.0,
                rect.bottom(),
                bounds.width,
                (bounds.height - rect.bottom()).max(0.0),
            ),
            left: DisplayRect::new(0.0, rect.y, rect.x.max(0.0), rect.height),
            right: DisplayRect::new(
                rect.right(),
                rect.y,
                (bounds.width - rect.right()).max(0.0),
                rect.height,
            ),
        }
    }

    pub const fn regions(&self) -> [DisplayRect; 4] {
        [self.top, self.bottom, self.left, self.right]
    }
}

/// Rectangle and mask to draw for one pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFrame {
    pub rect: DisplayRect,
    pub mask: CropMask,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveGesture {
    kind: GestureKind,
    pointer_origin: DisplayPoint,
    start: DisplayRect,
}

impl ActiveGesture {
    fn solve(&self, pointer: DisplayPoint, constraints: &CropConstraints) -> DisplayRect {
        let delta = DisplayPoint::new(
            pointer.x - self.pointer_origin.x,
            pointer.y - self.pointer_origin.y,
        );
        match self.kind {
            GestureKind::Move => solver::solve_move(self.start, delta, constraints.bounds),
            GestureKind::Resize(handle) => {
                solver::solve_resize(self.start, handle, delta, constraints)
            }
        }
    }
}

/// Tracks the single in-flight pointer gesture over the crop rectangle.
///
/// Samples are always solved against the rectangle captured at `begin`, so a
/// sample never depends on the ones before it.
#[derive(Debug, Default)]
pub struct GestureController {
    active: Option<ActiveGesture>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<GestureKind> {
        self.active.map(|gesture| gesture.kind)
    }

    /// Starts a gesture. Returns `false` and changes nothing if one is already
    /// running.
    pub fn begin(&mut self, kind: GestureKind, pointer: DisplayPoint, rect: DisplayRect) -> bool {
        if let Some(active) = self.active {
            tracing::debug!(
                ?kind,
                active = ?active.kind,
                "gesture start ignored; gesture in progress"
            );
            return false;
        }
        tracing::debug!(?kind, x = pointer.x, y = pointer.y, "crop gesture started");
        self.active = Some(ActiveGesture {
            kind,
            pointer_origin: pointer,
            start: rect,
        });
        true
    }

    pub fn update(
        &self,
        pointer: DisplayPoint,
        constraints: &CropConstraints,
    ) -> Option<GestureFrame> {
        let rect = self.active?.solve(pointer, constraints);
        Some(GestureFrame {
            rect,
            mask: CropMask::around(rect, constraints.bounds),
        })
    }

    /// Ends the gesture and returns the rectangle to commit.
    pub fn release(
        &mut self,
        pointer: DisplayPoint,
        constraints: &CropConstraints,
    ) -> Option<DisplayRect> {
        let gesture = self.active.take()?;
        let rect = solver::constrain(gesture.solve(pointer, constraints), constraints);
        tracing::debug!(
            kind = ?gesture.kind,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "crop gesture released"
        );
        Some(rect)
    }

    /// Drops the active gesture and returns the rectangle it started from.
    pub fn cancel(&mut self) -> Option<DisplayRect> {
        self.active.take().map(|gesture| gesture.start)
    }
}

/// Resolves which gesture a press at `point` should start.
pub fn hit_test(rect: &DisplayRect, point: DisplayPoint, radius: f64) -> Option<GestureKind> {
    if rect.is_empty() {
        return None;
    }
    for handle in CropHandle::ALL {
        let corner = handle.corner(rect);
        if (point.x - corner.x).abs() <= radius && (point.y - corner.y).abs() <= radius {
            return Some(GestureKind::Resize(handle));
        }
    }
    rect.contains(point).then_some(GestureKind::Move)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AspectRatio;

    fn constraints() -> CropConstraints {
        CropConstraints::new(
            DisplaySize::new(600.0, 800.0),
            AspectRatio::from_dimensions(1080, 1920),
            solver::MIN_CROP_SIZE,
        )
    }

    #[test]
    fn second_begin_is_ignored_while_active() {
        let mut controller = GestureController::new();
        let rect = DisplayRect::new(10.0, 10.0, 90.0, 160.0);
        assert!(controller.begin(GestureKind::Move, DisplayPoint::new(50.0, 50.0), rect));
        assert!(!controller.begin(
            GestureKind::Resize(CropHandle::TopLeft),
            DisplayPoint::new(10.0, 10.0),
            rect
        ));
        assert_eq!(controller.active_kind(), Some(GestureKind::Move));
    }

    #[test]
    fn update_solves_from_start_rect_not_previous_sample() {
        let mut controller = GestureController::new();
        let rect = DisplayRect::new(10.0, 10.0, 90.0, 160.0);
        controller.begin(GestureKind::Move, DisplayPoint::new(50.0, 50.0), rect);
        let constraints = constraints();

        let first = controller
            .update(DisplayPoint::new(80.0, 90.0), &constraints)
            .expect("active gesture should produce a frame");
        let again = controller
            .update(DisplayPoint::new(80.0, 90.0), &constraints)
            .expect("active gesture should produce a frame");
        assert_eq!(first, again);
        assert_eq!(first.rect, DisplayRect::new(40.0, 50.0, 90.0, 160.0));
    }

    #[test]
    fn frame_mask_covers_everything_outside_the_rect() {
        let mut controller = GestureController::new();
        let rect = DisplayRect::new(100.0, 200.0, 90.0, 160.0);
        controller.begin(GestureKind::Move, DisplayPoint::new(0.0, 0.0), rect);
        let frame = controller
            .update(DisplayPoint::new(0.0, 0.0), &constraints())
            .expect("frame expected");
        let covered: f64 = frame
            .mask
            .regions()
            .iter()
            .map(|region| region.width * region.height)
            .sum();
        assert!((covered + 90.0 * 160.0 - 600.0 * 800.0).abs() < 1e-6);
        assert_eq!(frame.mask.top, DisplayRect::new(0.0, 0.0, 600.0, 200.0));
    }

    #[test]
    fn release_clears_gesture_and_returns_bounded_rect() {
        let mut controller = GestureController::new();
        let rect = DisplayRect::new(500.0, 600.0, 90.0, 160.0);
        controller.begin(
            GestureKind::Resize(CropHandle::BottomRight),
            DisplayPoint::new(590.0, 760.0),
            rect,
        );
        let released = controller
            .release(DisplayPoint::new(900.0, 900.0), &constraints())
            .expect("release should yield a rect");
        assert!(!controller.is_active());
        assert!(released.fits_within(DisplaySize::new(600.0, 800.0)));
        assert!(controller.release(DisplayPoint::default(), &constraints()).is_none());
    }

    #[test]
    fn cancel_returns_start_rect() {
        let mut controller = GestureController::new();
        let rect = DisplayRect::new(5.0, 5.0, 90.0, 160.0);
        controller.begin(GestureKind::Move, DisplayPoint::new(1.0, 1.0), rect);
        assert_eq!(controller.cancel(), Some(rect));
        assert!(!controller.is_active());
    }

    #[test]
    fn hit_test_prefers_handles_over_body() {
        let rect = DisplayRect::new(100.0, 100.0, 90.0, 160.0);
        assert_eq!(
            hit_test(&rect, DisplayPoint::new(104.0, 97.0), HANDLE_HIT_RADIUS),
            Some(GestureKind::Resize(CropHandle::TopLeft))
        );
        assert_eq!(
            hit_test(&rect, DisplayPoint::new(190.0, 260.0), HANDLE_HIT_RADIUS),
            Some(GestureKind::Resize(CropHandle::BottomRight))
        );
        assert_eq!(
            hit_test(&rect, DisplayPoint::new(140.0, 180.0), HANDLE_HIT_RADIUS),
            Some(GestureKind::Move)
        );
        assert_eq!(
            hit_test(&rect, DisplayPoint::new(10.0, 10.0), HANDLE_HIT_RADIUS),
            None
        );
    }
}
