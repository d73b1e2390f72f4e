//! Monitored zone and its calibration.
//!
//! The zone is picked once before the main loop starts. How it was obtained
//! (pointer drag, config file, command line) is hidden behind
//! `CalibrationUi::select_zone`; the core only ever sees a `Zone`.

use anyhow::Result;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::SpeedCamError;
use crate::frame::Frame;

/// Axis-aligned rectangle in full-frame pixel coordinates.
///
/// Always normalized: `(x, y)` is the upper-left corner and the size is
/// non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Zone {
    /// Builds a zone from two opposite corners given in any order.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Result<Self, SpeedCamError> {
        let (left, right) = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (top, bottom) = if a.1 < b.1 { (a.1, b.1) } else { (b.1, a.1) };
        let zone = Zone {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        };
        if zone.width == 0 || zone.height == 0 {
            return Err(SpeedCamError::invalid(format!(
                "zone has zero size ({}x{})",
                zone.width, zone.height
            )));
        }
        Ok(zone)
    }

    /// Parses `x1,y1,x2,y2`.
    pub fn parse(value: &str) -> Result<Self, SpeedCamError> {
        let parts: Vec<u32> = value
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| SpeedCamError::invalid(format!("zone must be x1,y1,x2,y2: {value}")))?;
        match parts.as_slice() {
            [x1, y1, x2, y2] => Self::from_corners((*x1, *y1), (*x2, *y2)),
            _ => Err(SpeedCamError::invalid(format!(
                "zone must have four coordinates: {value}"
            ))),
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when the zone lies inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    pub fn ensure_fits(&self, width: u32, height: u32) -> Result<(), SpeedCamError> {
        if self.fits_within(width, height) {
            Ok(())
        } else {
            Err(SpeedCamError::invalid(format!(
                "zone {}x{}+{}+{} exceeds frame {}x{}",
                self.width, self.height, self.x, self.y, width, height
            )))
        }
    }

    /// Copies the zone out of a full frame image.
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image()
    }
}

// ----------------------------------------------------------------------------
// Pointer-driven calibration
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Press { x: u32, y: u32 },
    Move { x: u32, y: u32 },
    Release { x: u32, y: u32 },
}

/// Drag state for selecting a zone with a pointer.
///
/// A frontend feeds pointer events in; the main routine reads the finished
/// zone once the operator confirms.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSession {
    drawing: bool,
    start: Option<(u32, u32)>,
    end: Option<(u32, u32)>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Press { x, y } => self.press(x, y),
            PointerEvent::Move { x, y } => self.drag(x, y),
            PointerEvent::Release { x, y } => self.release(x, y),
        }
    }

    pub fn press(&mut self, x: u32, y: u32) {
        self.drawing = true;
        self.start = Some((x, y));
        self.end = None;
    }

    pub fn drag(&mut self, x: u32, y: u32) {
        if self.drawing {
            self.end = Some((x, y));
        }
    }

    pub fn release(&mut self, x: u32, y: u32) {
        if self.drawing {
            self.drawing = false;
            self.end = Some((x, y));
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Rectangle to draw as feedback while dragging, if any.
    pub fn current(&self) -> Option<Zone> {
        let (start, end) = (self.start?, self.end?);
        Zone::from_corners(start, end).ok()
    }

    /// Completed selection. Fails while a drag is in progress or when no
    /// usable rectangle was drawn.
    pub fn finish(&self) -> Result<Zone, SpeedCamError> {
        if self.drawing {
            return Err(SpeedCamError::invalid("zone selection still in progress"));
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => Zone::from_corners(start, end),
            _ => Err(SpeedCamError::invalid("no zone selected")),
        }
    }
}

/// Request/response zone selection.
pub trait CalibrationUi {
    fn select_zone(&mut self, frame: &Frame) -> Result<Zone>;
}

/// Replays recorded pointer events through a `CalibrationSession`.
#[derive(Clone, Debug, Default)]
pub struct PointerScript {
    events: Vec<PointerEvent>,
}

impl PointerScript {
    pub fn new(events: Vec<PointerEvent>) -> Self {
        Self { events }
    }

    /// A single press-drag-release gesture between two corners.
    pub fn drag(from: (u32, u32), to: (u32, u32)) -> Self {
        Self::new(vec![
            PointerEvent::Press {
                x: from.0,
                y: from.1,
            },
            PointerEvent::Move { x: to.0, y: to.1 },
            PointerEvent::Release { x: to.0, y: to.1 },
        ])
    }

    /// Gesture covering a known zone.
    pub fn for_zone(zone: Zone) -> Self {
        Self::drag((zone.x, zone.y), (zone.x + zone.width, zone.y + zone.height))
    }
}

impl CalibrationUi for PointerScript {
    fn select_zone(&mut self, frame: &Frame) -> Result<Zone> {
        let mut session = CalibrationSession::new();
        for event in &self.events {
            session.handle(*event);
        }
        let zone = session.finish()?;
        zone.ensure_fits(frame.width(), frame.height())?;
        log::info!(
            "monitored area: {} pixels ({}x{} at {},{})",
            zone.area(),
            zone.width,
            zone.height,
            zone.x,
            zone.y
        );
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn corners_are_normalized_regardless_of_drag_direction() {
        let expected = Zone {
            x: 10,
            y: 20,
            width: 90,
            height: 30,
        };
        assert_eq!(Zone::from_corners((10, 20), (100, 50)).unwrap(), expected);
        assert_eq!(Zone::from_corners((100, 50), (10, 20)).unwrap(), expected);
        assert_eq!(Zone::from_corners((100, 20), (10, 50)).unwrap(), expected);
    }

    #[test]
    fn empty_zone_is_invalid() {
        let err = Zone::from_corners((10, 20), (10, 80)).unwrap_err();
        assert!(matches!(err, SpeedCamError::InvalidConfiguration(_)));
        assert!(Zone::from_corners((5, 5), (40, 5)).is_err());
    }

    #[test]
    fn parse_accepts_four_coordinates() {
        let zone = Zone::parse("300, 200, 20, 100").unwrap();
        assert_eq!((zone.x, zone.y, zone.width, zone.height), (20, 100, 280, 100));
        assert!(Zone::parse("1,2,3").is_err());
        assert!(Zone::parse("a,b,c,d").is_err());
    }

    #[test]
    fn session_tracks_drag_and_ignores_moves_before_press() {
        let mut session = CalibrationSession::new();
        session.drag(50, 50);
        assert!(session.current().is_none());

        session.press(200, 150);
        assert!(session.is_drawing());
        session.drag(100, 100);
        assert_eq!(
            session.current(),
            Some(Zone {
                x: 100,
                y: 100,
                width: 100,
                height: 50
            })
        );
        assert!(session.finish().is_err());

        session.release(40, 90);
        assert!(!session.is_drawing());
        let zone = session.finish().unwrap();
        assert_eq!((zone.x, zone.y, zone.width, zone.height), (40, 90, 160, 60));
    }

    #[test]
    fn script_rejects_zone_outside_frame() {
        let frame = Frame::new(RgbImage::new(64, 48), UNIX_EPOCH);
        let mut ui = PointerScript::drag((10, 10), (70, 40));
        let err = ui.select_zone(&frame).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpeedCamError>(),
            Some(SpeedCamError::InvalidConfiguration(_))
        ));

        let mut ui = PointerScript::drag((10, 10), (64, 40));
        assert!(ui.select_zone(&frame).is_ok());
    }

    #[test]
    fn crop_copies_zone_pixels() {
        let mut img = RgbImage::new(8, 8);
        img.put_pixel(3, 4, image::Rgb([9, 9, 9]));
        let zone = Zone {
            x: 2,
            y: 3,
            width: 4,
            height: 2,
        };
        let cropped = zone.crop(&img);
        assert_eq!(cropped.dimensions(), (4, 2));
        assert_eq!(cropped.get_pixel(1, 1), &image::Rgb([9, 9, 9]));
    }
}
