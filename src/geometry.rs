//! Shared geometric primitives used across the crop engine.
//!
//! Display-space and native-space rectangles are distinct types; the only way
//! to move between them is through `crop::transform`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Self::Portrait, Self::Landscape];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pixel size of a decoded image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSize {
    pub width: u32,
    pub height: u32,
}

impl NativeSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Crop rectangle in on-screen pixels, relative to the image's display origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: DisplayPoint) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    pub fn fits_within(&self, bounds: DisplaySize) -> bool {
        const TOLERANCE: f64 = 1e-6;
        self.x >= -TOLERANCE
            && self.y >= -TOLERANCE
            && self.right() <= bounds.width + TOLERANCE
            && self.bottom() <= bounds.height + TOLERANCE
    }
}

/// Crop rectangle in the decoded image's pixel grid. A zero width means
/// "no crop set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl NativeRect {
    pub const ZERO: NativeRect = NativeRect::new(0, 0, 0, 0);

    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_zero(&self) -> bool {
        self.width == 0
    }
}

/// Output dimensions configured for one orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(self) -> AspectRatio {
        AspectRatio::from_dimensions(self.width, self.height)
    }
}

/// Width divided by height. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self(f64::from(width.max(1)) / f64::from(height.max(1)))
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn height_for(self, width: f64) -> f64 {
        width / self.0
    }

    pub fn width_for(self, height: f64) -> f64 {
        height * self.0
    }
}

/// Immutable per-process crop targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropTargets {
    pub portrait: TargetSize,
    pub landscape: TargetSize,
}

impl CropTargets {
    pub const fn new(portrait: TargetSize, landscape: TargetSize) -> Self {
        Self {
            portrait,
            landscape,
        }
    }

    pub const fn target(&self, orientation: Orientation) -> TargetSize {
        match orientation {
            Orientation::Portrait => self.portrait,
            Orientation::Landscape => self.landscape,
        }
    }

    pub fn ratio(&self, orientation: Orientation) -> AspectRatio {
        self.target(orientation).aspect_ratio()
    }
}

impl Default for CropTargets {
    fn default() -> Self {
        Self::new(TargetSize::new(1080, 1920), TargetSize::new(1920, 1080))
    }
}

/// Native and display geometry of the loaded image, with derived scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    native: NativeSize,
    display: DisplaySize,
    origin: DisplayPoint,
    scale_x: f64,
    scale_y: f64,
}

impl ImageGeometry {
    pub fn new(native: NativeSize, display: DisplaySize, origin: DisplayPoint) -> Self {
        let scale = |native: u32, display: f64| {
            if display > 0.0 {
                (f64::from(native) / display).max(f64::MIN_POSITIVE)
            } else {
                f64::MIN_POSITIVE
            }
        };
        Self {
            native,
            display,
            origin,
            scale_x: scale(native.width, display.width),
            scale_y: scale(native.height, display.height),
        }
    }

    pub const fn native(&self) -> NativeSize {
        self.native
    }

    pub const fn display(&self) -> DisplaySize {
        self.display
    }

    pub const fn origin(&self) -> DisplayPoint {
        self.origin
    }

    pub const fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub const fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn is_degenerate(&self) -> bool {
        self.display.is_empty() || self.native.is_empty()
    }

    /// Translates a container-relative pointer into image display coordinates.
    pub fn to_image_point(&self, container_point: DisplayPoint) -> DisplayPoint {
        DisplayPoint::new(
            container_point.x - self.origin.x,
            container_point.y - self.origin.y,
        )
    }
}
