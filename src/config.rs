use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::calibration::CalibrationParams;
use crate::detect::DetectorSettings;
use crate::error::SpeedCamError;
use crate::ingest::CameraConfig;
use crate::speed::SpeedUnit;
use crate::tracker::DEFAULT_MIN_TRACK_SECS;
use crate::zone::Zone;

const DEFAULT_SOURCE: &str = "stub://road";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_DISTANCE_FT: f64 = 76.0;
const DEFAULT_FOV_DEG: f64 = 53.5;
const DEFAULT_MIN_AREA: u64 = 175;
const DEFAULT_THRESHOLD: u8 = 15;
const DEFAULT_BLUR: u32 = 15;
const DEFAULT_DILATE: u32 = 2;
const DEFAULT_CSV_PATH: &str = "speeds.csv";
const DEFAULT_PREVIEW_PATH: &str = "preview.png";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SpeedCamConfigFile {
    camera: Option<CameraConfigFile>,
    calibration: Option<CalibrationConfigFile>,
    detection: Option<DetectionConfigFile>,
    tracking: Option<TrackingConfigFile>,
    output: Option<OutputConfigFile>,
    zone: Option<[u32; 4]>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    source: Option<String>,
    frame_resolution: Option<[u32; 2]>,
    frames_per_second: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CalibrationConfigFile {
    distance_to_zone_feet: Option<f64>,
    field_of_view_degrees: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    min_region_area_pixels: Option<u64>,
    change_threshold_intensity: Option<u8>,
    blur_kernel_size: Option<u32>,
    dilate_iterations: Option<u32>,
    background_learning_rate: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrackingConfigFile {
    min_track_secs: Option<f64>,
    speed_unit: Option<SpeedUnit>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    show_preview: Option<bool>,
    preview_path: Option<PathBuf>,
    save_to_csv: Option<bool>,
    csv_path: Option<PathBuf>,
    min_speed_to_save: Option<f64>,
}

/// Process configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct SpeedCamConfig {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub distance_to_zone_feet: f64,
    pub field_of_view_degrees: f64,
    pub detection: DetectorSettings,
    pub min_track_secs: f64,
    pub speed_unit: SpeedUnit,
    pub output: OutputSettings,
    /// Monitored rectangle, if fixed in config rather than chosen at startup.
    pub zone: Option<Zone>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub show_preview: bool,
    pub preview_path: PathBuf,
    pub save_to_csv: bool,
    pub csv_path: PathBuf,
    pub min_speed_to_save: f64,
}

impl Default for SpeedCamConfig {
    fn default() -> Self {
        Self::from_file(SpeedCamConfigFile::default())
    }
}

impl SpeedCamConfig {
    /// Loads `SPEEDCAM_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SPEEDCAM_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let file_cfg = file_cfg.unwrap_or_default();
        let zone = match file_cfg.zone {
            Some([x1, y1, x2, y2]) => Some(Zone::from_corners((x1, y1), (x2, y2))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.zone = zone;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SpeedCamConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let calibration = file.calibration.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let tracking = file.tracking.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        let [width, height] = camera
            .frame_resolution
            .unwrap_or([DEFAULT_WIDTH, DEFAULT_HEIGHT]);

        Self {
            source: camera.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            width,
            height,
            fps: camera.frames_per_second.unwrap_or(DEFAULT_FPS),
            distance_to_zone_feet: calibration
                .distance_to_zone_feet
                .unwrap_or(DEFAULT_DISTANCE_FT),
            field_of_view_degrees: calibration
                .field_of_view_degrees
                .unwrap_or(DEFAULT_FOV_DEG),
            detection: DetectorSettings {
                change_threshold: detection
                    .change_threshold_intensity
                    .unwrap_or(DEFAULT_THRESHOLD),
                min_region_area: detection.min_region_area_pixels.unwrap_or(DEFAULT_MIN_AREA),
                blur_kernel_size: detection.blur_kernel_size.unwrap_or(DEFAULT_BLUR),
                dilate_iterations: detection.dilate_iterations.unwrap_or(DEFAULT_DILATE),
                background_learning_rate: detection.background_learning_rate.unwrap_or(0.0),
            },
            min_track_secs: tracking.min_track_secs.unwrap_or(DEFAULT_MIN_TRACK_SECS),
            speed_unit: tracking.speed_unit.unwrap_or_default(),
            output: OutputSettings {
                show_preview: output.show_preview.unwrap_or(false),
                preview_path: output
                    .preview_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PREVIEW_PATH)),
                save_to_csv: output.save_to_csv.unwrap_or(false),
                csv_path: output
                    .csv_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
                min_speed_to_save: output.min_speed_to_save.unwrap_or(0.0),
            },
            zone: None,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("SPEEDCAM_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(distance) = std::env::var("SPEEDCAM_DISTANCE_FT") {
            self.distance_to_zone_feet = distance
                .trim()
                .parse()
                .map_err(|_| SpeedCamError::invalid("SPEEDCAM_DISTANCE_FT must be a number"))?;
        }
        if let Ok(fov) = std::env::var("SPEEDCAM_FOV_DEG") {
            self.field_of_view_degrees = fov
                .trim()
                .parse()
                .map_err(|_| SpeedCamError::invalid("SPEEDCAM_FOV_DEG must be a number"))?;
        }
        if let Ok(path) = std::env::var("SPEEDCAM_CSV_PATH") {
            if !path.trim().is_empty() {
                self.output.csv_path = PathBuf::from(path);
            }
        }
        if let Ok(flag) = std::env::var("SPEEDCAM_SAVE_CSV") {
            self.output.save_to_csv = parse_bool(&flag)
                .ok_or_else(|| SpeedCamError::invalid("SPEEDCAM_SAVE_CSV must be true or false"))?;
        }
        if let Ok(unit) = std::env::var("SPEEDCAM_UNIT") {
            if !unit.trim().is_empty() {
                self.speed_unit = unit.parse()?;
            }
        }
        if let Ok(zone) = std::env::var("SPEEDCAM_ZONE") {
            if !zone.trim().is_empty() {
                self.zone = Some(Zone::parse(&zone)?);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SpeedCamError::invalid(format!(
                "frame resolution must be non-zero, got {}x{}",
                self.width, self.height
            ))
            .into());
        }
        if self.fps == 0 {
            return Err(SpeedCamError::invalid("frames per second must be >= 1").into());
        }
        self.detection.validate()?;
        self.calibration().feet_per_pixel()?;
        if !self.min_track_secs.is_finite() || self.min_track_secs < 0.0 {
            return Err(SpeedCamError::invalid("min_track_secs must be >= 0").into());
        }
        if let Some(zone) = self.zone {
            zone.ensure_fits(self.width, self.height)?;
        }
        Ok(())
    }

    pub fn calibration(&self) -> CalibrationParams {
        CalibrationParams {
            field_of_view_degrees: self.field_of_view_degrees,
            distance_to_zone_feet: self.distance_to_zone_feet,
            frame_width_pixels: self.width,
        }
    }

    pub fn camera(&self) -> CameraConfig {
        CameraConfig {
            source: self.source.clone(),
            target_fps: self.fps,
            width: self.width,
            height: self.height,
            realtime: false,
        }
    }
}

fn read_config_file(path: &Path) -> Result<SpeedCamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        SpeedCamError::invalid(format!("invalid config file {}: {}", path.display(), e)).into()
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
