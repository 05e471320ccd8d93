use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::coordinator::CropSettings;
use crate::crop::MIN_CROP_SIZE;
use crate::geometry::{CropTargets, TargetSize};
use crate::reflow::{DEFAULT_FIT_MARGIN, DEFAULT_REFLOW_DEBOUNCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "meural-cropper";
const APP_CONFIG_FILE: &str = "config.json";

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) portrait_size: TargetSize,
    pub(crate) landscape_size: TargetSize,
    pub(crate) fit_margin: f64,
    pub(crate) reflow_debounce_ms: u64,
    pub(crate) min_crop_size: f64,
    pub(crate) input_dir: Option<PathBuf>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) crop_store_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let targets = CropTargets::default();
        Self {
            portrait_size: targets.portrait,
            landscape_size: targets.landscape,
            fit_margin: DEFAULT_FIT_MARGIN,
            reflow_debounce_ms: DEFAULT_REFLOW_DEBOUNCE.as_millis() as u64,
            min_crop_size: MIN_CROP_SIZE,
            input_dir: None,
            output_dir: None,
            crop_store_dir: None,
        }
    }
}

impl AppConfig {
    pub(crate) fn targets(&self) -> CropTargets {
        let defaults = CropTargets::default();
        let pick = |size: TargetSize, fallback: TargetSize| {
            if size.width == 0 || size.height == 0 {
                tracing::warn!(?size, "target size must be non-zero; using default");
                fallback
            } else {
                size
            }
        };
        CropTargets::new(
            pick(self.portrait_size, defaults.portrait),
            pick(self.landscape_size, defaults.landscape),
        )
    }

    pub(crate) fn settings(&self) -> CropSettings {
        let fit_margin = if self.fit_margin.is_finite() && self.fit_margin >= 0.0 {
            self.fit_margin
        } else {
            DEFAULT_FIT_MARGIN
        };
        let min_crop_size = if self.min_crop_size.is_finite() && self.min_crop_size > 0.0 {
            self.min_crop_size
        } else {
            MIN_CROP_SIZE
        };
        CropSettings {
            targets: self.targets(),
            min_crop_size,
            fit_margin,
            reflow_debounce: Duration::from_millis(self.reflow_debounce_ms),
        }
    }
}

pub(crate) fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            APP_DIR,
            APP_CONFIG_FILE,
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/config-root/meural-cropper/config.json")
        );
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path(APP_DIR, APP_CONFIG_FILE, None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/home/.config/meural-cropper/config.json")
        );
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path(APP_DIR, APP_CONFIG_FILE, None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_app_config_with(Some(dir.path()), None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.targets(), CropTargets::default());
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app_dir = dir.path().join(APP_DIR);
        std::fs::create_dir_all(&app_dir).expect("config dir");
        std::fs::write(
            app_dir.join(APP_CONFIG_FILE),
            r#"{"portrait_size": {"width": 1200, "height": 1600}, "reflow_debounce_ms": 300}"#,
        )
        .expect("config written");

        let config = load_app_config_with(Some(dir.path()), None);
        let settings = config.settings();

        assert_eq!(settings.targets.portrait, TargetSize::new(1200, 1600));
        assert_eq!(settings.targets.landscape, TargetSize::new(1920, 1080));
        assert_eq!(settings.reflow_debounce, Duration::from_millis(300));
        assert_eq!(settings.fit_margin, DEFAULT_FIT_MARGIN);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app_dir = dir.path().join(APP_DIR);
        std::fs::create_dir_all(&app_dir).expect("config dir");
        std::fs::write(app_dir.join(APP_CONFIG_FILE), "{oops").expect("config written");

        assert_eq!(
            load_app_config_with(Some(dir.path()), None),
            AppConfig::default()
        );
    }

    #[test]
    fn invalid_values_are_replaced_by_defaults() {
        let config = AppConfig {
            portrait_size: TargetSize::new(0, 1920),
            min_crop_size: -4.0,
            fit_margin: f64::NAN,
            ..AppConfig::default()
        };
        let settings = config.settings();
        assert_eq!(settings.targets.portrait, TargetSize::new(1080, 1920));
        assert_eq!(settings.min_crop_size, MIN_CROP_SIZE);
        assert_eq!(settings.fit_margin, DEFAULT_FIT_MARGIN);
    }
}
