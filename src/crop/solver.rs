//! Aspect-locked move/resize solving against the image's display bounds.
//!
//! Every function here is pure. Live previews call the solver on each pointer
//! sample and the release path calls it once more with the same inputs, so
//! identical inputs must give identical rectangles.

use crate::geometry::{AspectRatio, DisplayPoint, DisplayRect, DisplaySize};

pub const MIN_CROP_SIZE: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CropHandle {
    pub const ALL: [CropHandle; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Outward growth direction of the handle on each axis.
    const fn direction(self) -> (f64, f64) {
        match self {
            Self::TopLeft => (-1.0, -1.0),
            Self::TopRight => (1.0, -1.0),
            Self::BottomLeft => (-1.0, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }

    pub fn corner(self, rect: &DisplayRect) -> DisplayPoint {
        match self {
            Self::TopLeft => DisplayPoint::new(rect.x, rect.y),
            Self::TopRight => DisplayPoint::new(rect.right(), rect.y),
            Self::BottomLeft => DisplayPoint::new(rect.x, rect.bottom()),
            Self::BottomRight => DisplayPoint::new(rect.right(), rect.bottom()),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }
}

/// Everything the solver needs to know about the image and the orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropConstraints {
    pub bounds: DisplaySize,
    pub ratio: AspectRatio,
    pub min_size: f64,
}

impl CropConstraints {
    pub const fn new(bounds: DisplaySize, ratio: AspectRatio, min_size: f64) -> Self {
        Self {
            bounds,
            ratio,
            min_size,
        }
    }

    /// Smallest width keeping both sides at or above the size floor.
    fn min_width(&self) -> f64 {
        self.min_size.max(self.ratio.width_for(self.min_size))
    }

    /// Largest width whose ratio-derived height still fits the bounds.
    fn max_width(&self) -> f64 {
        self.bounds
            .width
            .min(self.ratio.width_for(self.bounds.height))
            .max(0.0)
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    value.clamp(0.0, max.max(0.0))
}

/// Translates the rectangle, clamping each axis independently. Size is kept.
pub fn solve_move(rect: DisplayRect, delta: DisplayPoint, bounds: DisplaySize) -> DisplayRect {
    DisplayRect::new(
        clamp_axis(rect.x + delta.x, bounds.width - rect.width),
        clamp_axis(rect.y + delta.y, bounds.height - rect.height),
        rect.width,
        rect.height,
    )
}

/// Resizes `start` by dragging `handle` by `delta` while the opposite corner
/// stays put.
///
/// The dominant drag axis drives the width and the height always follows from
/// the ratio. When the result would cross an image edge, the rectangle is
/// shrunk to the edge instead of rejecting the drag: edge containment takes
/// precedence over both the requested size and the minimum size floor.
pub fn solve_resize(
    start: DisplayRect,
    handle: CropHandle,
    delta: DisplayPoint,
    constraints: &CropConstraints,
) -> DisplayRect {
    let bounds = constraints.bounds;
    let ratio = constraints.ratio;
    let (dir_x, dir_y) = handle.direction();
    let anchor = handle.opposite().corner(&start);
    let anchor = DisplayPoint::new(
        clamp_axis(anchor.x, bounds.width),
        clamp_axis(anchor.y, bounds.height),
    );

    let requested_width = if delta.x.abs() >= delta.y.abs() {
        start.width + dir_x * delta.x
    } else {
        ratio.width_for(start.height + dir_y * delta.y)
    };

    let room_x = if dir_x > 0.0 {
        bounds.width - anchor.x
    } else {
        anchor.x
    };
    let room_y = if dir_y > 0.0 {
        bounds.height - anchor.y
    } else {
        anchor.y
    };
    let max_width = room_x.min(ratio.width_for(room_y)).max(0.0);

    let width = requested_width.max(constraints.min_width()).min(max_width);
    let height = ratio.height_for(width);
    let x = if dir_x > 0.0 { anchor.x } else { anchor.x - width };
    let y = if dir_y > 0.0 { anchor.y } else { anchor.y - height };
    DisplayRect::new(x, y, width, height)
}

/// Brings an arbitrary rectangle back in line with the ratio and the bounds.
///
/// Used after gesture release and after a reflow re-projection, where rounding
/// or a shrunken viewport may have left the rectangle slightly off.
pub fn constrain(rect: DisplayRect, constraints: &CropConstraints) -> DisplayRect {
    if rect.is_empty() {
        return default_rect(constraints);
    }
    let width = rect
        .width
        .max(constraints.min_width())
        .min(constraints.max_width());
    let height = constraints.ratio.height_for(width);
    DisplayRect::new(
        clamp_axis(rect.x, constraints.bounds.width - width),
        clamp_axis(rect.y, constraints.bounds.height - height),
        width,
        height,
    )
}

/// Largest centered rectangle with the target ratio that fits the bounds.
pub fn default_rect(constraints: &CropConstraints) -> DisplayRect {
    let bounds = constraints.bounds;
    if bounds.is_empty() {
        return DisplayRect::default();
    }
    let ratio = constraints.ratio;
    let width_fit_height = ratio.height_for(bounds.width);
    let (width, height) = if width_fit_height <= bounds.height {
        (bounds.width, width_fit_height)
    } else {
        (ratio.width_for(bounds.height), bounds.height)
    };
    DisplayRect::new(
        (bounds.width - width) / 2.0,
        (bounds.height - height) / 2.0,
        width,
        height,
    )
}
