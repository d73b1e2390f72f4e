mod backend;
pub mod change;
pub mod ops;
mod result;

pub use backend::MotionDetector;
pub use change::{BackgroundModel, ChangeDetector, DetectorSettings};
pub use result::{BoundingBox, MotionEvent};
