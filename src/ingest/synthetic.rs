//! Synthetic road scene (`stub://` sources).
//!
//! Renders a static textured road with a bright block crossing it at a
//! fixed pixel speed, alternating direction on each pass, separated by an
//! empty gap. Timestamps advance by exactly `1 / fps` per frame so runs are
//! reproducible; `pace` additionally sleeps between frames for live demos.

use anyhow::Result;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant, SystemTime};

use crate::frame::Frame;

/// Scene parameters for the synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticScene {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Vehicle speed in pixels per second.
    pub speed_px_per_sec: f64,
    pub vehicle_width: u32,
    pub vehicle_height: u32,
    /// Empty road time between passes.
    pub gap_secs: f64,
    /// Peak per-channel sensor noise.
    pub noise: u8,
    pub seed: u64,
    /// Sleep between frames to match `fps` in wall-clock time.
    pub pace: bool,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            speed_px_per_sec: 240.0,
            vehicle_width: 80,
            vehicle_height: 40,
            gap_secs: 1.5,
            noise: 2,
            seed: 7,
            pace: false,
        }
    }
}

pub(crate) struct SyntheticSource {
    scene: SyntheticScene,
    label: String,
    frame_count: u64,
    start: Option<SystemTime>,
    last_emit: Option<Instant>,
    background: RgbImage,
    rng: StdRng,
}

impl SyntheticSource {
    pub(crate) fn new(label: &str, scene: SyntheticScene) -> Self {
        let background = road_background(scene.width, scene.height);
        let rng = StdRng::seed_from_u64(scene.seed);
        Self {
            scene,
            label: label.to_string(),
            frame_count: 0,
            start: None,
            last_emit: None,
            background,
            rng,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.start = Some(SystemTime::now());
        log::info!(
            "CameraSource: connected to {} (synthetic {}x{} @ {} fps)",
            self.label,
            self.scene.width,
            self.scene.height,
            self.scene.fps
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let start = *self.start.get_or_insert_with(SystemTime::now);
        let fps = self.scene.fps.max(1) as f64;
        let t = self.frame_count as f64 / fps;

        if self.scene.pace {
            let interval = Duration::from_secs_f64(1.0 / fps);
            if let Some(last) = self.last_emit {
                let since = last.elapsed();
                if since < interval {
                    std::thread::sleep(interval - since);
                }
            }
            self.last_emit = Some(Instant::now());
        }

        let mut image = self.background.clone();
        if let Some((x, _)) = self.vehicle_position(t) {
            self.draw_vehicle(&mut image, x);
        }
        self.add_noise(&mut image);

        self.frame_count += 1;
        Ok(Frame::new(image, start + Duration::from_secs_f64(t)))
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// Left edge of the vehicle at time `t` (may be off-frame), and whether
    /// this pass runs right to left. `None` during the gap.
    fn vehicle_position(&self, t: f64) -> Option<(i64, bool)> {
        let s = &self.scene;
        let travel = (s.width + s.vehicle_width) as f64;
        let crossing = travel / s.speed_px_per_sec;
        let period = crossing + s.gap_secs;
        let pass = (t / period).floor() as u64;
        let within = t - pass as f64 * period;
        if within >= crossing {
            return None;
        }
        let offset = within * s.speed_px_per_sec;
        let reversed = pass % 2 == 1;
        let x = if reversed {
            s.width as f64 - offset
        } else {
            offset - s.vehicle_width as f64
        };
        Some((x.round() as i64, reversed))
    }

    fn draw_vehicle(&self, image: &mut RgbImage, left: i64) {
        let s = &self.scene;
        let top = (s.height.saturating_sub(s.vehicle_height)) / 2;
        let x0 = left.max(0) as u32;
        let x1 = (left + s.vehicle_width as i64).clamp(0, s.width as i64) as u32;
        for y in top..(top + s.vehicle_height).min(s.height) {
            for x in x0..x1 {
                image.put_pixel(x, y, Rgb([230, 225, 210]));
            }
        }
    }

    fn add_noise(&mut self, image: &mut RgbImage) {
        let amp = self.scene.noise as i16;
        if amp == 0 {
            return;
        }
        for px in image.pixels_mut() {
            for c in px.0.iter_mut() {
                let n: i16 = self.rng.gen_range(-amp..=amp);
                *c = (*c as i16 + n).clamp(0, 255) as u8;
            }
        }
    }
}

/// Dark asphalt with lane markings and a faint texture.
fn road_background(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    let lane_y = height / 2;
    for (x, y, px) in img.enumerate_pixels_mut() {
        let texture = ((x * 7 + y * 13) % 11) as u8;
        let base = 50 + texture;
        let marking = y.abs_diff(lane_y) <= 1 && (x / 24) % 2 == 0;
        *px = if marking {
            Rgb([200, 200, 120])
        } else {
            Rgb([base, base, base + 4])
        };
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::seconds_between;

    fn scene() -> SyntheticScene {
        SyntheticScene {
            width: 160,
            height: 80,
            fps: 10,
            speed_px_per_sec: 100.0,
            vehicle_width: 20,
            vehicle_height: 10,
            gap_secs: 1.0,
            noise: 0,
            ..SyntheticScene::default()
        }
    }

    #[test]
    fn timestamps_advance_by_frame_interval() -> Result<()> {
        let mut source = SyntheticSource::new("stub://test", scene());
        source.connect()?;
        let f0 = source.next_frame()?;
        let f1 = source.next_frame()?;
        assert_eq!(f0.width(), 160);
        assert!((seconds_between(f1.timestamp, f0.timestamp) - 0.1).abs() < 1e-6);
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn vehicle_crosses_then_gap_then_reverses() {
        let source = SyntheticSource::new("stub://test", scene());
        assert_eq!(source.vehicle_position(0.0), Some((-20, false)));
        assert_eq!(source.vehicle_position(1.0), Some((80, false)));
        // Crossing takes 1.8s, gap 1.0s.
        assert_eq!(source.vehicle_position(2.0), None);
        assert_eq!(source.vehicle_position(2.9), Some((150, true)));
        assert_eq!(source.vehicle_position(3.8), Some((60, true)));
    }

    #[test]
    fn vehicle_is_drawn_over_background() -> Result<()> {
        let mut source = SyntheticSource::new("stub://test", scene());
        let empty = road_background(160, 80);
        for _ in 0..10 {
            source.next_frame()?;
        }
        // t = 1.0s: vehicle spans x 80..100.
        let frame = source.next_frame()?;
        assert_eq!(frame.image.get_pixel(90, 40), &Rgb([230, 225, 210]));
        assert_eq!(frame.image.get_pixel(10, 10), empty.get_pixel(10, 10));
        Ok(())
    }
}
