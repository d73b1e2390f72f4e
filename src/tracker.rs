//! Single-object speed tracking state machine.
//!
//! ```text
//!            found                       found, elapsed > min
//!  Waiting ---------> Tracking --+-----------------------------> emit, stay
//!     ^                  |       |  found, elapsed <= min
//!     |    not found     |       +-----------------------------> stay
//!     +------------------+
//! ```
//!
//! A track starts on the first motion frame after a quiet frame. Every
//! motion frame past the minimum dwell time yields an independent estimate
//! measured from the track's first position and time.

use std::time::SystemTime;

use crate::detect::MotionEvent;
use crate::frame::seconds_between;
use crate::speed::{Direction, SpeedEstimator, SpeedRecord};

/// Dwell time a track must exceed before it yields estimates.
pub const DEFAULT_MIN_TRACK_SECS: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackPhase {
    Waiting,
    Tracking {
        initial_x: u32,
        initial_timestamp: SystemTime,
    },
}

pub struct SpeedTracker {
    estimator: SpeedEstimator,
    min_track_secs: f64,
    phase: TrackPhase,
    tracks_started: u64,
}

impl SpeedTracker {
    pub fn new(estimator: SpeedEstimator) -> Self {
        Self::with_min_track_secs(estimator, DEFAULT_MIN_TRACK_SECS)
    }

    pub fn with_min_track_secs(estimator: SpeedEstimator, min_track_secs: f64) -> Self {
        Self {
            estimator,
            min_track_secs,
            phase: TrackPhase::Waiting,
            tracks_started: 0,
        }
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, TrackPhase::Tracking { .. })
    }

    /// Number of `Waiting -> Tracking` transitions so far.
    pub fn tracks_started(&self) -> u64 {
        self.tracks_started
    }

    pub fn estimator(&self) -> &SpeedEstimator {
        &self.estimator
    }

    /// Advance the state machine by one frame's motion event.
    pub fn update(&mut self, event: &MotionEvent) -> Option<SpeedRecord> {
        let region = match (event.found, event.region) {
            (true, Some(region)) => region,
            _ => {
                if self.is_tracking() {
                    log::debug!("track abandoned: motion lost");
                }
                self.phase = TrackPhase::Waiting;
                return None;
            }
        };

        match self.phase {
            TrackPhase::Waiting => {
                self.phase = TrackPhase::Tracking {
                    initial_x: region.x,
                    initial_timestamp: event.timestamp,
                };
                self.tracks_started += 1;
                log::debug!("track {} started at x={}", self.tracks_started, region.x);
                None
            }
            TrackPhase::Tracking {
                initial_x,
                initial_timestamp,
            } => {
                let elapsed = seconds_between(event.timestamp, initial_timestamp);
                if elapsed <= self.min_track_secs {
                    return None;
                }
                let dx = region.x as i64 - initial_x as i64;
                let pixels = dx.unsigned_abs() as u32;
                Some(SpeedRecord {
                    speed: self.estimator.estimate(pixels as f64, elapsed),
                    unit: self.estimator.unit(),
                    timestamp: event.timestamp,
                    direction: Direction::from_displacement(dx),
                    pixels,
                    elapsed_secs: elapsed,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::speed::SpeedUnit;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_000_000 + ms)
    }

    fn seen(x: u32, ms: u64) -> MotionEvent {
        MotionEvent::found(BoundingBox { x, y: 5, w: 30, h: 20 }, at(ms))
    }

    fn quiet(ms: u64) -> MotionEvent {
        MotionEvent::none(at(ms))
    }

    fn tracker() -> SpeedTracker {
        SpeedTracker::new(SpeedEstimator::new(0.1, SpeedUnit::Mph))
    }

    #[test]
    fn waiting_ignores_quiet_frames() {
        let mut t = tracker();
        for i in 0..10 {
            assert!(t.update(&quiet(i * 33)).is_none());
            assert_eq!(t.phase(), TrackPhase::Waiting);
        }
        assert_eq!(t.tracks_started(), 0);
    }

    #[test]
    fn first_motion_starts_track_without_emitting() {
        let mut t = tracker();
        assert!(t.update(&seen(100, 0)).is_none());
        assert_eq!(
            t.phase(),
            TrackPhase::Tracking {
                initial_x: 100,
                initial_timestamp: at(0)
            }
        );
    }

    #[test]
    fn linear_crossing_emits_after_half_second() {
        let mut t = tracker();
        let mut records = Vec::new();
        // x goes 100 -> 180 over exactly one second in 10 steps.
        for step in 0..=10u64 {
            let x = 100 + (step as u32) * 8;
            if let Some(r) = t.update(&seen(x, step * 100)) {
                records.push((step, r));
            }
        }
        assert_eq!(records.first().map(|(s, _)| *s), Some(6));
        let (_, last) = records.last().unwrap();
        assert_eq!(last.pixels, 80);
        assert!((last.elapsed_secs - 1.0).abs() < 1e-9);
        assert!((last.speed - 5.454544).abs() < 1e-6);
        assert_eq!(last.direction, Direction::LeftToRight);
        assert_eq!(last.unit, SpeedUnit::Mph);
        assert_eq!(t.tracks_started(), 1);
    }

    #[test]
    fn exactly_half_second_does_not_emit() {
        let mut t = tracker();
        t.update(&seen(100, 0));
        assert!(t.update(&seen(140, 500)).is_none());
        assert!(t.update(&seen(141, 501)).is_some());
    }

    #[test]
    fn losing_motion_abandons_track() {
        let mut t = tracker();
        t.update(&seen(100, 0));
        t.update(&seen(110, 200));
        assert!(t.update(&quiet(300)).is_none());
        assert_eq!(t.phase(), TrackPhase::Waiting);

        // Restart measures from the new first sighting.
        t.update(&seen(300, 400));
        let r = t.update(&seen(260, 1400)).unwrap();
        assert_eq!(r.pixels, 40);
        assert_eq!(r.direction, Direction::RightToLeft);
        assert_eq!(t.tracks_started(), 2);
    }

    #[test]
    fn one_track_per_contiguous_run() {
        let mut t = tracker();
        let pattern = [true, true, true, false, false, true, false, true, true];
        for (i, found) in pattern.iter().enumerate() {
            let ms = i as u64 * 100;
            let ev = if *found { seen(50, ms) } else { quiet(ms) };
            t.update(&ev);
        }
        assert_eq!(t.tracks_started(), 3);
    }

    #[test]
    fn clock_stepping_backwards_never_emits() {
        let mut t = tracker();
        t.update(&seen(100, 2000));
        assert!(t.update(&seen(180, 1000)).is_none());
        assert!(t.is_tracking());
    }

    #[test]
    fn stationary_object_reports_zero() {
        let mut t = tracker();
        t.update(&seen(100, 0));
        let r = t.update(&seen(100, 900)).unwrap();
        assert_eq!(r.speed, 0.0);
        assert_eq!(r.direction, Direction::Unknown);
    }
}
