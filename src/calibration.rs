//! Pixel-to-distance calibration.
//!
//! A camera with horizontal field of view `fov` looking at a road
//! `distance` feet away sees a strip `2 * tan(fov / 2) * distance` feet
//! wide. Dividing by the frame width in pixels gives a single linear
//! feet-per-pixel factor. No lens or perspective correction is applied.

use crate::error::SpeedCamError;

/// Operator-supplied calibration geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationParams {
    pub field_of_view_degrees: f64,
    pub distance_to_zone_feet: f64,
    /// Width in pixels spanned by the field of view.
    pub frame_width_pixels: u32,
}

impl CalibrationParams {
    pub fn feet_per_pixel(&self) -> Result<f64, SpeedCamError> {
        compute_feet_per_pixel(
            self.field_of_view_degrees,
            self.distance_to_zone_feet,
            self.frame_width_pixels,
        )
    }
}

/// Feet covered by one horizontal pixel at the zone's distance.
pub fn compute_feet_per_pixel(
    fov_degrees: f64,
    distance_feet: f64,
    frame_width_pixels: u32,
) -> Result<f64, SpeedCamError> {
    if frame_width_pixels == 0 {
        return Err(SpeedCamError::invalid("frame width must be positive"));
    }
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(SpeedCamError::invalid(format!(
            "field of view must be within (0, 180) degrees, got {fov_degrees}"
        )));
    }
    if !distance_feet.is_finite() || distance_feet <= 0.0 {
        return Err(SpeedCamError::invalid(format!(
            "distance to zone must be positive, got {distance_feet}"
        )));
    }
    let frame_width_feet = 2.0 * (fov_degrees * 0.5).to_radians().tan() * distance_feet;
    Ok(frame_width_feet / frame_width_pixels as f64)
}
