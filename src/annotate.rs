//! Preview rendering.
//!
//! Stands in for an on-screen window: the annotated frame is written to an
//! image file the operator can keep open in a viewer.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::detect::BoundingBox;
use crate::zone::Zone;

pub const ZONE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const REGION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws a rectangle outline `thickness` pixels wide, growing inwards and
/// clipped to the image.
pub fn draw_rect(
    img: &mut RgbImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgb<u8>,
    thickness: u32,
) {
    for t in 0..thickness {
        let inset = 2 * t;
        if w <= inset || h <= inset {
            break;
        }
        let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(w - inset, h - inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Copy of `frame` with the zone and the tracked region outlined.
///
/// `region` is zone-relative, as reported by the detector.
pub fn annotate(frame: &RgbImage, zone: Zone, region: Option<BoundingBox>) -> RgbImage {
    let mut out = frame.clone();
    draw_rect(&mut out, zone.x, zone.y, zone.width, zone.height, ZONE_COLOR, 2);
    if let Some(r) = region {
        draw_rect(&mut out, zone.x + r.x, zone.y + r.y, r.w, r.h, REGION_COLOR, 1);
    }
    out
}

/// Overwrites a preview image on every frame.
pub struct PreviewWriter {
    path: PathBuf,
    zone: Zone,
}

impl PreviewWriter {
    pub fn new(path: impl AsRef<Path>, zone: Zone) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            zone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, frame: &RgbImage, region: Option<BoundingBox>) -> Result<()> {
        annotate(frame, self.zone, region)
            .save(&self.path)
            .with_context(|| format!("write preview {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_outline_only_touches_border() {
        let mut img = RgbImage::new(10, 10);
        draw_rect(&mut img, 2, 2, 5, 4, ZONE_COLOR, 1);
        assert_eq!(img.get_pixel(2, 2), &ZONE_COLOR);
        assert_eq!(img.get_pixel(6, 5), &ZONE_COLOR);
        assert_eq!(img.get_pixel(4, 3), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(7, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn rect_is_clipped_to_image() {
        let mut img = RgbImage::new(8, 8);
        draw_rect(&mut img, 5, 5, 10, 10, REGION_COLOR, 2);
        assert_eq!(img.get_pixel(7, 7), &REGION_COLOR);
        draw_rect(&mut img, 20, 20, 3, 3, REGION_COLOR, 1);
    }

    #[test]
    fn thick_outline_grows_inwards() {
        let mut img = RgbImage::new(10, 10);
        draw_rect(&mut img, 1, 1, 8, 8, ZONE_COLOR, 2);
        assert_eq!(img.get_pixel(1, 1), &ZONE_COLOR);
        assert_eq!(img.get_pixel(2, 2), &ZONE_COLOR);
        assert_eq!(img.get_pixel(3, 3), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        draw_rect(&mut img, 0, 0, 0, 4, ZONE_COLOR, 1);
    }

    #[test]
    fn region_is_offset_by_zone() {
        let frame = RgbImage::new(40, 30);
        let zone = Zone {
            x: 10,
            y: 5,
            width: 20,
            height: 20,
        };
        let out = annotate(&frame, zone, Some(BoundingBox { x: 3, y: 4, w: 5, h: 5 }));
        assert_eq!(out.get_pixel(10, 5), &ZONE_COLOR);
        assert_eq!(out.get_pixel(13, 9), &REGION_COLOR);
    }

    #[test]
    fn preview_writes_png() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let zone = Zone {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        let writer = PreviewWriter::new(dir.path().join("preview.png"), zone);
        writer.write(&RgbImage::new(8, 8), None)?;
        let back = image::open(writer.path())?.to_rgb8();
        assert_eq!(back.get_pixel(0, 0), &ZONE_COLOR);
        Ok(())
    }
}
