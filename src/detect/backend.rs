use anyhow::Result;

use crate::detect::result::MotionEvent;
use crate::frame::Frame;

/// Per-frame motion detector feeding the speed tracker.
///
/// Implementations see each frame exactly once, in capture order, and must
/// not keep the frame past the `process` call.
pub trait MotionDetector {
    /// Detector identifier.
    fn name(&self) -> &'static str;

    /// Classify a frame as containing motion or not.
    fn process(&mut self, frame: &Frame) -> Result<MotionEvent>;

    /// Drop any learned state so the next frame starts a fresh warm-up.
    fn reset(&mut self) {}
}
