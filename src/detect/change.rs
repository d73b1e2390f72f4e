//! Background-differencing change detector.
//!
//! Each frame is cropped to the zone, reduced to intensity and smoothed. The
//! first frame becomes the background model; every later frame is
//! differenced against it, thresholded, dilated, and split into connected
//! regions. The largest region above the noise floor is the motion event.

use anyhow::Result;
use image::GrayImage;

use crate::detect::backend::MotionDetector;
use crate::detect::ops;
use crate::detect::result::MotionEvent;
use crate::error::SpeedCamError;
use crate::frame::Frame;
use crate::zone::Zone;

/// Noise policy for change detection.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    /// Intensity difference a pixel must exceed to count as changed.
    pub change_threshold: u8,
    /// Bounding-box area a region must exceed to count as motion.
    pub min_region_area: u64,
    /// Odd smoothing kernel width.
    pub blur_kernel_size: u32,
    pub dilate_iterations: u32,
    /// Weight of each new frame in the background model. 0 keeps the
    /// background fixed after warm-up.
    pub background_learning_rate: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            change_threshold: 15,
            min_region_area: 175,
            blur_kernel_size: 15,
            dilate_iterations: 2,
            background_learning_rate: 0.0,
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<(), SpeedCamError> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(SpeedCamError::invalid(format!(
                "blur kernel size must be odd and positive, got {}",
                self.blur_kernel_size
            )));
        }
        if !(0.0..1.0).contains(&self.background_learning_rate) {
            return Err(SpeedCamError::invalid(format!(
                "background learning rate must be in [0, 1), got {}",
                self.background_learning_rate
            )));
        }
        Ok(())
    }
}

/// Per-pixel floating-point background estimate over the zone.
#[derive(Clone, Debug)]
pub struct BackgroundModel {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl BackgroundModel {
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            samples: gray.pixels().map(|p| p.0[0] as f32).collect(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Exponential running average: `bg = (1 - alpha) * bg + alpha * frame`.
    pub fn accumulate(&mut self, gray: &GrayImage, alpha: f32) {
        for (bg, px) in self.samples.iter_mut().zip(gray.pixels()) {
            *bg = (1.0 - alpha) * *bg + alpha * px.0[0] as f32;
        }
    }
}

/// Detects motion inside a fixed zone against a background model.
pub struct ChangeDetector {
    zone: Zone,
    settings: DetectorSettings,
    background: Option<BackgroundModel>,
}

impl ChangeDetector {
    pub fn new(zone: Zone, settings: DetectorSettings) -> Result<Self, SpeedCamError> {
        settings.validate()?;
        Ok(Self {
            zone,
            settings,
            background: None,
        })
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn background(&self) -> Option<&BackgroundModel> {
        self.background.as_ref()
    }

    /// Crop, convert to intensity, and smooth.
    fn prepare(&self, frame: &Frame) -> Result<GrayImage> {
        self.zone.ensure_fits(frame.width(), frame.height())?;
        let cropped = self.zone.crop(&frame.image);
        let gray = ops::intensity(&cropped);
        Ok(ops::smooth(&gray, self.settings.blur_kernel_size))
    }

    /// Binary change mask of `gray` against the current background.
    fn change_mask(&self, gray: &GrayImage, background: &BackgroundModel) -> GrayImage {
        let delta = ops::abs_diff(gray, background.samples());
        let mask = ops::threshold(&delta, self.settings.change_threshold);
        ops::dilate(&mask, self.settings.dilate_iterations)
    }
}

impl MotionDetector for ChangeDetector {
    fn name(&self) -> &'static str {
        "change"
    }

    fn process(&mut self, frame: &Frame) -> Result<MotionEvent> {
        let gray = self.prepare(frame)?;

        let background = match &self.background {
            Some(background) => background,
            None => {
                log::debug!(
                    "background model initialised ({}x{})",
                    gray.width(),
                    gray.height()
                );
                self.background = Some(BackgroundModel::from_gray(&gray));
                return Ok(MotionEvent::none(frame.timestamp));
            }
        };

        let mask = self.change_mask(&gray, background);
        let regions = ops::region_bounds(&mask);
        let best = ops::largest_region(&regions, self.settings.min_region_area);

        let alpha = self.settings.background_learning_rate;
        if alpha > 0.0 {
            if let Some(background) = self.background.as_mut() {
                background.accumulate(&gray, alpha);
            }
        }

        Ok(match best {
            Some(region) => MotionEvent::found(region, frame.timestamp),
            None => MotionEvent::none(frame.timestamp),
        })
    }

    fn reset(&mut self) {
        self.background = None;
    }
}
