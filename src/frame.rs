//! Frames and the frame source contract.
//!
//! - `Frame`: one timestamped RGB capture covering the full sensor view.
//! - `FrameSource`: blocking, infinite, non-restartable producer of frames.
//!
//! Frames are ephemeral. The processing loop drops each one after the
//! detector has looked at it; only the background model's derived statistic
//! outlives a frame.

use anyhow::Result;
use image::RgbImage;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// A full camera frame with its capture time.
#[derive(Debug)]
pub struct Frame {
    pub image: RgbImage,
    pub timestamp: SystemTime,
}

impl Frame {
    pub fn new(image: RgbImage, timestamp: SystemTime) -> Self {
        Self { image, timestamp }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Seconds from `start` to `end`. Negative when the clock stepped backwards.
pub fn seconds_between(end: SystemTime, start: SystemTime) -> f64 {
    match end.duration_since(start) {
        Ok(d) => d.as_secs_f64(),
        Err(err) => -err.duration().as_secs_f64(),
    }
}

/// Seconds since the Unix epoch, as written to CSV logs.
pub fn epoch_seconds(ts: SystemTime) -> f64 {
    ts.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

// ----------------------------------------------------------------------------
// FrameSource
// ----------------------------------------------------------------------------

/// Produces frames for the processing loop.
///
/// `next_frame` blocks until a frame is available. A source that can no
/// longer produce frames returns `SpeedCamError::SourceUnavailable`.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_between_handles_both_directions() {
        let t0 = UNIX_EPOCH + Duration::from_secs(100);
        let t1 = t0 + Duration::from_millis(1500);
        assert!((seconds_between(t1, t0) - 1.5).abs() < 1e-9);
        assert!((seconds_between(t0, t1) + 1.5).abs() < 1e-9);
        assert_eq!(seconds_between(t0, t0), 0.0);
    }

    #[test]
    fn frame_reports_dimensions() {
        let frame = Frame::new(RgbImage::new(64, 48), UNIX_EPOCH);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
    }
}
