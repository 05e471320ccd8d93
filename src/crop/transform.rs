use crate::geometry::{DisplayRect, ImageGeometry, NativeRect};

// Absorbs float noise such as 4.999999999 for values that are integral on paper.
const PIXEL_EPSILON: f64 = 1e-6;

fn floor_pixel(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let floored = (value + PIXEL_EPSILON).floor();
    if floored >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        floored as u32
    }
}

/// Projects a display-space rectangle onto the native pixel grid.
///
/// Each coordinate is floored independently, after which width and height are
/// clamped so the rectangle never reaches past the native image edge.
pub fn to_native(rect: DisplayRect, geometry: &ImageGeometry) -> NativeRect {
    if geometry.is_degenerate() || rect.is_empty() {
        return NativeRect::ZERO;
    }
    let native = geometry.native();
    let x = floor_pixel(rect.x * geometry.scale_x()).min(native.width);
    let y = floor_pixel(rect.y * geometry.scale_y()).min(native.height);
    let width = floor_pixel(rect.width * geometry.scale_x()).min(native.width - x);
    let height = floor_pixel(rect.height * geometry.scale_y()).min(native.height - y);
    if width == 0 || height == 0 {
        return NativeRect::ZERO;
    }
    NativeRect::new(x, y, width, height)
}

/// Projects a stored native rectangle onto the current display geometry.
pub fn to_display(rect: NativeRect, geometry: &ImageGeometry) -> DisplayRect {
    if geometry.is_degenerate() || rect.is_zero() {
        return DisplayRect::default();
    }
    DisplayRect::new(
        f64::from(rect.x) / geometry.scale_x(),
        f64::from(rect.y) / geometry.scale_y(),
        f64::from(rect.width) / geometry.scale_x(),
        f64::from(rect.height) / geometry.scale_y(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DisplayPoint, DisplaySize, NativeSize};

    fn geometry(native: (u32, u32), display: (f64, f64)) -> ImageGeometry {
        ImageGeometry::new(
            NativeSize::new(native.0, native.1),
            DisplaySize::new(display.0, display.1),
            DisplayPoint::default(),
        )
    }

    #[test]
    fn to_native_scales_and_floors_each_coordinate() {
        let geometry = geometry((3000, 4000), (600.0, 800.0));
        let native = to_native(DisplayRect::new(37.3, 12.9, 225.0, 400.0), &geometry);
        assert_eq!(native, NativeRect::new(186, 64, 1125, 2000));
    }

    #[test]
    fn to_native_clamps_size_to_native_edges() {
        let geometry = geometry((1000, 1000), (1000.0, 1000.0));
        let native = to_native(DisplayRect::new(500.0, 900.0, 600.0, 150.0), &geometry);
        assert_eq!(native, NativeRect::new(500, 900, 500, 100));
    }

    #[test]
    fn degenerate_geometry_yields_zero_rectangles() {
        let geometry = geometry((3000, 4000), (0.0, 0.0));
        assert!(to_native(DisplayRect::new(1.0, 1.0, 10.0, 10.0), &geometry).is_zero());
        assert!(to_display(NativeRect::new(1, 1, 10, 10), &geometry).is_empty());
    }

    #[test]
    fn zero_native_rect_projects_to_empty_display_rect() {
        let geometry = geometry((3000, 4000), (600.0, 800.0));
        assert!(to_display(NativeRect::ZERO, &geometry).is_empty());
    }

    #[test]
    fn round_trip_stays_within_one_display_pixel() {
        let geometries = [
            geometry((3000, 4000), (600.0, 800.0)),
            geometry((1000, 1500), (333.0, 500.0)),
            geometry((4032, 3024), (1217.0, 912.75)),
            geometry((800, 600), (800.0, 600.0)),
        ];
        let rects = [
            DisplayRect::new(0.0, 0.0, 100.0, 177.77),
            DisplayRect::new(12.5, 33.3, 180.2, 320.35),
            DisplayRect::new(50.0, 10.0, 240.0, 135.0),
            DisplayRect::new(1.1, 2.2, 31.9, 56.71),
        ];
        for geometry in &geometries {
            for rect in rects {
                let display = to_display(to_native(rect, geometry), geometry);
                assert!((display.x - rect.x).abs() <= 1.0, "{rect:?} via {geometry:?}");
                assert!((display.y - rect.y).abs() <= 1.0, "{rect:?} via {geometry:?}");
                assert!((display.width - rect.width).abs() <= 1.0);
                assert!((display.height - rect.height).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn integral_products_survive_float_noise() {
        let geometry = geometry((1000, 1000), (300.0, 300.0));
        let native = to_native(DisplayRect::new(30.0, 60.0, 150.0, 150.0), &geometry);
        assert_eq!(native, NativeRect::new(100, 200, 500, 500));
    }
}
