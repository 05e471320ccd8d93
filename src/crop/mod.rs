//! Crop rectangle geometry: space conversion, constraint solving and gestures.

pub mod gesture;
pub mod solver;
pub mod transform;

pub use gesture::{hit_test, CropMask, GestureController, GestureFrame, GestureKind};
pub use solver::{CropConstraints, CropHandle, MIN_CROP_SIZE};
pub use transform::{to_display, to_native};
