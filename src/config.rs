// config.rs: layered viewer configuration
//
// Load order: built-in defaults -> optional JSON file (--config) -> CLI flags.
// The language can also come from PANO_HOTSPOTS_LANG.

use crate::error::ConfigError;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Geometry of the panorama cylinder. Fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaConfig {
    pub radius: f32,
    pub height: f32,
}

impl Default for PanoramaConfig {
    fn default() -> Self {
        Self {
            radius: 1340.0,
            height: 1643.0,
        }
    }
}

impl PanoramaConfig {
    pub fn circumference(&self) -> f32 {
        2.0 * std::f32::consts::PI * self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    /// Distance of the eye from the cylinder axis.
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 60.0,
            distance: 250.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Negative values invert the drag direction (drag the image, not the camera).
    pub rotate_speed: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotate_speed: -0.25,
            enable_damping: true,
            damping_factor: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub image: PathBuf,
    pub annotations: PathBuf,
    pub load_timeout_secs: u64,
    pub load_retries: u32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("image.jpg"),
            annotations: PathBuf::from("image.svg"),
            load_timeout_secs: 10,
            load_retries: 2,
        }
    }
}

impl AssetConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub panorama: PanoramaConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub assets: AssetConfig,
    pub lang: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            panorama: PanoramaConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            assets: AssetConfig::default(),
            lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pano_hotspots",
    version,
    about = "Cylindrical panorama viewer with clickable hotspots"
)]
pub struct Cli {
    /// JSON config file; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Panorama raster image.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// SVG document with `data-type="item"` / `data-type="panel"` rectangles.
    #[arg(long)]
    pub annotations: Option<PathBuf>,

    #[arg(long)]
    pub radius: Option<f32>,

    #[arg(long)]
    pub height: Option<f32>,

    /// UI language (en, fr, de).
    #[arg(long, env = "PANO_HOTSPOTS_LANG")]
    pub lang: Option<String>,
}

impl ViewerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(p) = &cli.image {
            self.assets.image = p.clone();
        }
        if let Some(p) = &cli.annotations {
            self.assets.annotations = p.clone();
        }
        if let Some(r) = cli.radius {
            self.panorama.radius = r;
        }
        if let Some(h) = cli.height {
            self.panorama.height = h;
        }
        if let Some(lang) = &cli.lang {
            if !lang.trim().is_empty() {
                self.lang = lang.trim().to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["pano_hotspots"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn defaults_match_reference_scene() {
        let c = ViewerConfig::default();
        assert_eq!(c.panorama.radius, 1340.0);
        assert_eq!(c.panorama.height, 1643.0);
        assert_eq!(c.camera.fov_deg, 60.0);
        assert_eq!(c.camera.distance, 250.0);
        assert_eq!(c.controls.rotate_speed, -0.25);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: ViewerConfig =
            serde_json::from_str(r#"{ "panorama": { "radius": 1000 } }"#).unwrap();
        assert_eq!(c.panorama.radius, 1000.0);
        assert_eq!(c.panorama.height, 1643.0);
        assert_eq!(c.assets.load_retries, 2);
    }

    #[test]
    fn cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "panorama": {{ "radius": 900, "height": 500 }}, "lang": "fr" }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = cli(&["--config", &path, "--radius", "1200", "--image", "a.png"]);
        let c = ViewerConfig::load(&args).unwrap();
        assert_eq!(c.panorama.radius, 1200.0);
        assert_eq!(c.panorama.height, 500.0);
        assert_eq!(c.assets.image, PathBuf::from("a.png"));
        assert_eq!(c.lang, "fr");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = ViewerConfig::load(&cli(&["--config", "/definitely/not/here.json"])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn circumference_of_default_panorama() {
        let c = PanoramaConfig::default();
        assert!((c.circumference() - 8419.468).abs() < 0.01);
    }
}
