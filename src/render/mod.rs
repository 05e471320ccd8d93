//! Image decoding and final crop rendering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use thiserror::Error;

use crate::geometry::{NativeRect, NativeSize, Orientation, TargetSize};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("no image found for {0}")]
    MissingImage(String),
    #[error("crop rectangle is empty after clamping")]
    EmptyCrop,
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Resolves the native pixel size of an image by identifier.
pub trait ImageSource {
    fn resolve_native_dimensions(&self, identifier: &str) -> RenderResult<NativeSize>;
}

/// Images stored as `<input_dir>/<identifier>`.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    input_dir: PathBuf,
}

impl FsImageSource {
    pub const fn new(input_dir: PathBuf) -> Self {
        Self { input_dir }
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.input_dir.join(identifier)
    }
}

impl ImageSource for FsImageSource {
    fn resolve_native_dimensions(&self, identifier: &str) -> RenderResult<NativeSize> {
        let path = self.path_for(identifier);
        if identifier.is_empty() || !path.is_file() {
            return Err(RenderError::MissingImage(identifier.to_string()));
        }
        let (width, height) = image::image_dimensions(&path)?;
        tracing::debug!(identifier, width, height, "native dimensions resolved");
        Ok(NativeSize::new(width, height))
    }
}

/// `<output_root>/<orientation>/<stem>_<orientation>.jpg`, where `stem` is the
/// identifier without its file extension.
pub fn output_path(output_root: &Path, identifier: &str, orientation: Orientation) -> PathBuf {
    let stem = Path::new(identifier)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(identifier);
    let mut path = output_root.join(orientation.label());
    path.push(format!("{stem}_{orientation}.jpg"));
    path
}

/// Clamps a stored rectangle to the actual image, which may differ slightly
/// from the dimensions the crop was drawn against.
pub fn clamp_to_image(rect: NativeRect, size: NativeSize) -> NativeRect {
    if size.is_empty() {
        return NativeRect::ZERO;
    }
    let x = rect.x.min(size.width - 1);
    let y = rect.y.min(size.height - 1);
    NativeRect::new(
        x,
        y,
        rect.width.min(size.width - x),
        rect.height.min(size.height - y),
    )
}

/// Largest size with the crop's proportions that fits the target.
pub fn fit_within(width: u32, height: u32, target: TargetSize) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let ratio = (f64::from(target.width) / f64::from(width))
        .min(f64::from(target.height) / f64::from(height));
    let fitted_width = (f64::from(width) * ratio + 1e-9).floor() as u32;
    let fitted_height = (f64::from(height) * ratio + 1e-9).floor() as u32;
    (
        fitted_width.clamp(1, target.width.max(1)),
        fitted_height.clamp(1, target.height.max(1)),
    )
}

/// Crops `image`, scales the crop to fit `target` and centers it on a black
/// canvas of exactly the target size.
pub fn render_image(
    image: &DynamicImage,
    rect: NativeRect,
    target: TargetSize,
) -> RenderResult<RgbImage> {
    let rect = clamp_to_image(rect, NativeSize::new(image.width(), image.height()));
    if rect.width == 0 || rect.height == 0 {
        return Err(RenderError::EmptyCrop);
    }
    let cropped = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
    let (width, height) = fit_within(rect.width, rect.height, target);
    let resized = cropped
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(target.width, target.height, Rgb([0, 0, 0]));
    let offset_x = i64::from((target.width - width) / 2);
    let offset_y = i64::from((target.height - height) / 2);
    imageops::overlay(&mut canvas, &resized, offset_x, offset_y);
    Ok(canvas)
}

pub fn render_crop(
    source: &Path,
    rect: NativeRect,
    target: TargetSize,
    destination: &Path,
) -> RenderResult<()> {
    let image = image::open(source)?;
    let rendered = render_image(&image, rect, target)?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    rendered.save_with_format(destination, ImageFormat::Jpeg)?;
    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        width = target.width,
        height = target.height,
        "crop rendered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_png(path: &Path, width: u32, height: u32) {
        let image = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 255, 255])
            } else {
                Rgb([200, 40, 40])
            }
        });
        image.save(path).expect("test image should be written");
    }

    #[test]
    fn output_path_nests_by_orientation() {
        assert_eq!(
            output_path(Path::new("/out"), "abc", Orientation::Portrait),
            PathBuf::from("/out/portrait/abc_portrait.jpg")
        );
        assert_eq!(
            output_path(Path::new("/out"), "trip/beach.jpeg", Orientation::Landscape),
            PathBuf::from("/out/landscape/beach_landscape.jpg")
        );
    }

    #[test]
    fn clamp_to_image_trims_overhanging_crop() {
        let size = NativeSize::new(100, 200);
        let clamped = clamp_to_image(NativeRect::new(90, 10, 50, 500), size);
        assert_eq!(clamped, NativeRect::new(90, 10, 10, 190));
        let clamped = clamp_to_image(NativeRect::new(500, 500, 5, 5), size);
        assert_eq!(clamped, NativeRect::new(99, 199, 1, 1));
    }

    #[test]
    fn fit_within_keeps_crop_proportions() {
        assert_eq!(
            fit_within(2250, 4000, TargetSize::new(1080, 1920)),
            (1080, 1920)
        );
        assert_eq!(
            fit_within(1000, 1000, TargetSize::new(1920, 1080)),
            (1080, 1080)
        );
    }

    #[test]
    fn render_image_letterboxes_mismatched_crop() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
        let rendered = render_image(
            &image,
            NativeRect::new(0, 0, 40, 40),
            TargetSize::new(32, 18),
        )
        .expect("render should work");
        assert_eq!(rendered.dimensions(), (32, 18));
        assert_eq!(rendered.get_pixel(0, 9), &Rgb([0, 0, 0]));
        assert_eq!(rendered.get_pixel(16, 9), &Rgb([255, 255, 255]));
    }

    #[test]
    fn render_crop_writes_target_sized_jpeg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("input.png");
        write_test_png(&source, 90, 160);
        let destination = output_path(dir.path(), "input.png", Orientation::Portrait);

        render_crop(
            &source,
            NativeRect::new(0, 0, 45, 80),
            TargetSize::new(18, 32),
            &destination,
        )
        .expect("render should work");

        assert_eq!(
            image::image_dimensions(&destination).expect("output readable"),
            (18, 32)
        );
    }

    #[test]
    fn fs_source_resolves_dimensions_and_reports_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_test_png(&dir.path().join("photo.png"), 30, 20);
        let source = FsImageSource::new(dir.path().to_path_buf());

        assert_eq!(
            source
                .resolve_native_dimensions("photo.png")
                .expect("dimensions"),
            NativeSize::new(30, 20)
        );
        assert!(matches!(
            source.resolve_native_dimensions("missing.png"),
            Err(RenderError::MissingImage(_))
        ));
    }
}
