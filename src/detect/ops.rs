//! Image operations behind change detection.
//!
//! All operate on single-channel `GrayImage`s of the zone size. Masks use
//! 0 for background and 255 for foreground.

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::detect::result::BoundingBox;

pub const FOREGROUND: u8 = 255;

/// Single-channel intensity of an RGB image.
pub fn intensity(rgb: &RgbImage) -> GrayImage {
    imageops::grayscale(rgb)
}

/// Gaussian sigma for an odd smoothing kernel size (`0.3*((k-1)*0.5-1)+0.8`).
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised `kernel_size`-tap Gaussian weights.
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = kernel_sigma(kernel_size) as f64;
    let center = (kernel_size as f64 - 1.0) / 2.0;
    let raw: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / sum) as f32).collect()
}

/// Separable Gaussian smoothing with exactly `kernel_size` taps per axis.
/// A kernel of 1 is a no-op.
pub fn smooth(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return gray.clone();
    }
    filter::separable_filter_equal(gray, &gaussian_kernel(kernel_size))
}

/// Per-pixel `|frame - round(background)|`, saturated to `u8`.
///
/// `background` is row-major and must hold `width * height` samples.
pub fn abs_diff(frame: &GrayImage, background: &[f32]) -> GrayImage {
    debug_assert_eq!(
        background.len(),
        (frame.width() * frame.height()) as usize
    );
    let mut out = GrayImage::new(frame.width(), frame.height());
    for ((dst, src), bg) in out.pixels_mut().zip(frame.pixels()).zip(background) {
        let reference = bg.round().clamp(0.0, 255.0) as u8;
        *dst = Luma([src.0[0].abs_diff(reference)]);
    }
    out
}

/// Binary mask of pixels strictly above `cutoff`.
pub fn threshold(gray: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, src) in out.pixels_mut().zip(gray.pixels()) {
        if src.0[0] > cutoff {
            *dst = Luma([FOREGROUND]);
        }
    }
    out
}

/// Grows foreground by a 3x3 square element, `iterations` times.
///
/// `iterations` passes of a 3x3 square equal one chessboard-distance
/// dilation of radius `iterations`.
pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    let radius = u8::try_from(iterations).unwrap_or(u8::MAX);
    morphology::dilate(mask, Norm::LInf, radius)
}

/// Bounding boxes of the 8-connected foreground regions of a mask, in
/// raster order of each region's first pixel.
pub fn region_bounds(mask: &GrayImage) -> Vec<BoundingBox> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut slot_of_label: Vec<Option<usize>> = Vec::new();
    let mut extents: Vec<(u32, u32, u32, u32)> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if slot_of_label.len() <= label {
            slot_of_label.resize(label + 1, None);
        }
        match slot_of_label[label] {
            Some(slot) => {
                let e = &mut extents[slot];
                e.0 = e.0.min(x);
                e.1 = e.1.min(y);
                e.2 = e.2.max(x);
                e.3 = e.3.max(y);
            }
            None => {
                slot_of_label[label] = Some(extents.len());
                extents.push((x, y, x, y));
            }
        }
    }

    extents
        .into_iter()
        .map(|(min_x, min_y, max_x, max_y)| BoundingBox {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        })
        .collect()
}

/// Largest region whose bounding-box area exceeds `min_area`.
///
/// Ties keep the first region found in scan order.
pub fn largest_region(regions: &[BoundingBox], min_area: u64) -> Option<BoundingBox> {
    let mut best: Option<BoundingBox> = None;
    for region in regions {
        let area = region.area();
        if area > min_area && best.map_or(true, |b| area > b.area()) {
            best = Some(*region);
        }
    }
    best
}
