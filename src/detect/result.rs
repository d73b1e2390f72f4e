use std::time::SystemTime;

/// Bounding box of a moving region, in zone-relative pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Result of running change detection on one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionEvent {
    /// Did a region above the noise floor show up?
    pub found: bool,
    /// Largest qualifying region. `Some` exactly when `found`.
    pub region: Option<BoundingBox>,
    pub timestamp: SystemTime,
}

impl MotionEvent {
    pub fn none(timestamp: SystemTime) -> Self {
        Self {
            found: false,
            region: None,
            timestamp,
        }
    }

    pub fn found(region: BoundingBox, timestamp: SystemTime) -> Self {
        Self {
            found: true,
            region: Some(region),
            timestamp,
        }
    }
}
