//! Speed estimation from pixel displacement over elapsed time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::error::SpeedCamError;

/// Miles per hour in one foot per second.
pub const FPS_TO_MPH: f64 = 0.681818;
/// Kilometres per hour in one foot per second.
pub const FPS_TO_KPH: f64 = 1.09728;

/// Display unit for speed estimates.
///
/// Config files, environment and command line all parse through `FromStr`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SpeedUnit {
    #[default]
    Mph,
    Kph,
    /// Feet per second, no conversion.
    Fps,
}

impl SpeedUnit {
    /// Factor converting feet per second into this unit.
    pub fn conversion_factor(self) -> f64 {
        match self {
            SpeedUnit::Mph => FPS_TO_MPH,
            SpeedUnit::Kph => FPS_TO_KPH,
            SpeedUnit::Fps => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedUnit::Mph => "mph",
            SpeedUnit::Kph => "kph",
            SpeedUnit::Fps => "fps",
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedUnit {
    type Err = SpeedCamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mph" => Ok(SpeedUnit::Mph),
            "kph" | "kmh" | "km/h" => Ok(SpeedUnit::Kph),
            "fps" | "ft/s" => Ok(SpeedUnit::Fps),
            other => Err(SpeedCamError::invalid(format!("unknown speed unit: {other}"))),
        }
    }
}

impl TryFrom<String> for SpeedUnit {
    type Error = SpeedCamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `(pixels * feet_per_pixel / secs) * unit_factor`, or 0 when `secs <= 0`.
pub fn estimate_speed(
    pixel_displacement: f64,
    feet_per_pixel: f64,
    elapsed_seconds: f64,
    unit_factor: f64,
) -> f64 {
    if elapsed_seconds > 0.0 {
        (pixel_displacement * feet_per_pixel / elapsed_seconds) * unit_factor
    } else {
        0.0
    }
}

/// Estimator bound to one calibration and one display unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedEstimator {
    feet_per_pixel: f64,
    unit: SpeedUnit,
}

impl SpeedEstimator {
    pub fn new(feet_per_pixel: f64, unit: SpeedUnit) -> Self {
        Self {
            feet_per_pixel,
            unit,
        }
    }

    pub fn feet_per_pixel(&self) -> f64 {
        self.feet_per_pixel
    }

    pub fn unit(&self) -> SpeedUnit {
        self.unit
    }

    pub fn estimate(&self, pixel_displacement: f64, elapsed_seconds: f64) -> f64 {
        estimate_speed(
            pixel_displacement,
            self.feet_per_pixel,
            elapsed_seconds,
            self.unit.conversion_factor(),
        )
    }
}

/// Horizontal direction of travel through the zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Unknown,
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn from_displacement(dx: i64) -> Self {
        match dx {
            0 => Direction::Unknown,
            d if d > 0 => Direction::LeftToRight,
            _ => Direction::RightToLeft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Unknown => "unknown",
            Direction::LeftToRight => "left_to_right",
            Direction::RightToLeft => "right_to_left",
        }
    }
}

/// One speed estimate, handed to the sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedRecord {
    pub speed: f64,
    pub unit: SpeedUnit,
    pub timestamp: SystemTime,
    pub direction: Direction,
    /// Absolute pixel displacement since the track started.
    pub pixels: u32,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_elapsed_yields_zero() {
        for secs in [0.0, -0.1, -5.0] {
            assert_eq!(estimate_speed(80.0, 0.1, secs, FPS_TO_MPH), 0.0);
        }
    }

    #[test]
    fn zero_displacement_yields_zero() {
        for secs in [0.01, 0.6, 3.0] {
            assert_eq!(estimate_speed(0.0, 0.1, secs, FPS_TO_MPH), 0.0);
        }
    }

    #[test]
    fn eighty_pixels_in_one_second() {
        let est = SpeedEstimator::new(0.1, SpeedUnit::Mph);
        let mph = est.estimate(80.0, 1.0);
        assert!((mph - 5.454544).abs() < 1e-9);
    }

    #[test]
    fn unit_factor_is_swappable() {
        let fps = SpeedEstimator::new(0.1, SpeedUnit::Fps).estimate(80.0, 1.0);
        let kph = SpeedEstimator::new(0.1, SpeedUnit::Kph).estimate(80.0, 1.0);
        assert!((fps - 8.0).abs() < 1e-12);
        assert!((kph - 8.0 * FPS_TO_KPH).abs() < 1e-12);
    }

    #[test]
    fn units_parse_and_display() {
        assert_eq!("MPH".parse::<SpeedUnit>().unwrap(), SpeedUnit::Mph);
        assert_eq!("km/h".parse::<SpeedUnit>().unwrap(), SpeedUnit::Kph);
        assert_eq!(SpeedUnit::Fps.to_string(), "fps");
        assert!("knots".parse::<SpeedUnit>().is_err());
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(Direction::from_displacement(12), Direction::LeftToRight);
        assert_eq!(Direction::from_displacement(-3), Direction::RightToLeft);
        assert_eq!(Direction::from_displacement(0), Direction::Unknown);
    }
}
