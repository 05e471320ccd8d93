mod config;
pub mod coordinator;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod notification;
pub mod reflow;
pub mod render;
pub mod session;
pub mod storage;
pub use error::{AppError, AppResult};

use std::path::{Path, PathBuf};

use coordinator::{Coordinator, CoordinatorError};
use geometry::{DisplaySize, Orientation};
use notification::{DesktopNotifier, Notifier};
use render::{FsImageSource, ImageSource};
use session::Stage;
use storage::CropStore;

const DEFAULT_OUTPUT_DIR: &str = "output";

/// Entrypoint used by the CLI binding. Every argument names an image under the
/// configured input directory; each one gets its saved or default crops
/// submitted and rendered.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting meural-cropper");

    let identifiers: Vec<String> = std::env::args().skip(1).collect();
    if identifiers.is_empty() {
        tracing::warn!("no images given; usage: meural-cropper <image>...");
        return Ok(());
    }

    let config = config::load_app_config();
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let store = match &config.crop_store_dir {
        Some(dir) => CropStore::with_root(dir.clone()),
        None => CropStore::with_default_root()?,
    }
    .with_output_root(output_dir.clone());
    let input_dir = config
        .input_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let source = FsImageSource::new(input_dir);
    let mut coordinator = Coordinator::new(config.settings(), store, DesktopNotifier);

    process_images(&mut coordinator, &source, &output_dir, &identifiers)
}

/// Processes every identifier, continuing past failures. Fails if any image
/// could not be processed.
fn process_images<N: Notifier>(
    coordinator: &mut Coordinator<CropStore, N>,
    source: &FsImageSource,
    output_dir: &Path,
    identifiers: &[String],
) -> AppResult<()> {
    let mut failed = 0usize;
    for identifier in identifiers {
        if let Err(err) = process_image(coordinator, source, output_dir, identifier) {
            failed += 1;
            tracing::error!(identifier = %identifier, %err, "image processing failed");
        }
    }
    let total = identifiers.len();
    tracing::info!(processed = total - failed, failed, "run complete");
    if failed > 0 {
        return Err(AppError::Incomplete { failed, total });
    }
    Ok(())
}

fn process_image<N: Notifier>(
    coordinator: &mut Coordinator<CropStore, N>,
    source: &FsImageSource,
    output_dir: &Path,
    identifier: &str,
) -> AppResult<()> {
    let native = source.resolve_native_dimensions(identifier)?;
    // Headless runs lay the image out at native scale.
    let margin = coordinator.settings().fit_margin;
    coordinator.resize_viewport(DisplaySize::new(
        f64::from(native.width) + 2.0 * margin,
        f64::from(native.height) + 2.0 * margin,
    ))?;
    let ticket = coordinator.begin_selection(identifier)?;
    coordinator.complete_selection(&ticket, native)?;

    while matches!(
        coordinator.stage(),
        Some(Stage::Portrait | Stage::Landscape)
    ) {
        coordinator.advance()?;
    }

    let targets = coordinator.settings().targets;
    let session = coordinator
        .session()
        .ok_or(CoordinatorError::NoActiveImage)?;
    for orientation in Orientation::ALL {
        let rect = session.crop(orientation);
        if rect.is_zero() {
            continue;
        }
        let destination = render::output_path(output_dir, identifier, orientation);
        render::render_crop(
            &source.path_for(identifier),
            rect,
            targets.target(orientation),
            &destination,
        )?;
        coordinator
            .persistence()
            .mark_rendered(identifier, orientation)?;
    }

    let status = coordinator.persistence().status(identifier)?;
    tracing::info!(identifier, ?status, "image processed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CropSettings;
    use crate::storage::{CropPersistence, ProcessingStatus};

    struct QuietNotifier;

    impl Notifier for QuietNotifier {
        fn notify(&self, _body: &str) {}
    }

    struct Workspace {
        _dir: tempfile::TempDir,
        source: FsImageSource,
        store_root: PathBuf,
        output_dir: PathBuf,
    }

    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().expect("tempdir");
        let input_dir = dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("input dir");
        image::RgbImage::from_pixel(90, 160, image::Rgb([90, 140, 200]))
            .save(input_dir.join("photo.png"))
            .expect("input image written");
        Workspace {
            source: FsImageSource::new(input_dir),
            store_root: dir.path().join("crops"),
            output_dir: dir.path().join("output"),
            _dir: dir,
        }
    }

    fn coordinator_for(
        workspace: &Workspace,
        output_dir: &Path,
    ) -> Coordinator<CropStore, QuietNotifier> {
        let store =
            CropStore::with_root(workspace.store_root.clone()).with_output_root(output_dir.into());
        Coordinator::new(CropSettings::default(), store, QuietNotifier)
    }

    #[test]
    fn processed_image_is_rendered_and_marked_both() {
        let workspace = workspace();
        let mut coordinator = coordinator_for(&workspace, &workspace.output_dir);

        process_image(
            &mut coordinator,
            &workspace.source,
            &workspace.output_dir,
            "photo.png",
        )
        .expect("processing should work");

        for orientation in Orientation::ALL {
            let path = render::output_path(&workspace.output_dir, "photo.png", orientation);
            assert!(path.is_file(), "missing {orientation} output");
        }
        assert_eq!(
            coordinator
                .persistence()
                .status("photo.png")
                .expect("status"),
            ProcessingStatus::Both
        );
    }

    #[test]
    fn failed_render_leaves_status_unprocessed() {
        let workspace = workspace();
        let blocked = workspace.output_dir.with_file_name("blocked");
        std::fs::write(&blocked, b"not a directory").expect("blocking file written");
        let mut coordinator = coordinator_for(&workspace, &blocked);

        let err = process_image(&mut coordinator, &workspace.source, &blocked, "photo.png")
            .expect_err("render into a file path should fail");

        assert!(matches!(err, AppError::Render(_)));
        let store = coordinator.persistence();
        assert!(store
            .fetch_crop("photo.png", Orientation::Portrait)
            .expect("fetch")
            .is_some());
        assert_eq!(
            store.status("photo.png").expect("status"),
            ProcessingStatus::Unprocessed
        );
    }

    #[test]
    fn run_fails_when_any_image_fails() {
        let workspace = workspace();
        let mut coordinator = coordinator_for(&workspace, &workspace.output_dir);
        let identifiers = vec!["photo.png".to_string(), "missing.png".to_string()];

        let err = process_images(
            &mut coordinator,
            &workspace.source,
            &workspace.output_dir,
            &identifiers,
        )
        .expect_err("one missing image should fail the run");

        assert!(matches!(
            err,
            AppError::Incomplete {
                failed: 1,
                total: 2
            }
        ));
    }

    #[test]
    fn reset_after_processing_removes_outputs() {
        let workspace = workspace();
        let mut coordinator = coordinator_for(&workspace, &workspace.output_dir);
        process_image(
            &mut coordinator,
            &workspace.source,
            &workspace.output_dir,
            "photo.png",
        )
        .expect("processing should work");

        coordinator.reset().expect("reset should work");

        for orientation in Orientation::ALL {
            let path = render::output_path(&workspace.output_dir, "photo.png", orientation);
            assert!(!path.exists(), "{orientation} output should be removed");
        }
        assert_eq!(
            coordinator
                .persistence()
                .status("photo.png")
                .expect("status"),
            ProcessingStatus::Unprocessed
        );
    }
}
