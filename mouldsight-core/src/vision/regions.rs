//! Defect region extraction from a similarity map.
//!
//! The dissimilarity image is binarized at its Otsu level, outer contours of
//! the foreground blobs are traced, and each contour becomes a
//! [`DefectRegion`] with its bounding box and enclosed area. Blobs nested
//! inside another blob's hole are part of that blob and are not reported.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use tracing::debug;

use super::ssim::SimilarityMap;
use crate::result::DefectRegion;

/// Otsu threshold of an 8-bit image.
///
/// Only splits leaving pixels on both sides are considered, and a later level
/// replaces the best only with a strictly greater between-class variance. A
/// single-valued image therefore yields 0.
pub fn otsu_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_background = 0u64;
    let mut sum_background = 0.0;
    let mut best_variance = 0.0;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += count;
        sum_background += level as f64 * count as f64;

        let weight_foreground = total - weight_background;
        if weight_background == 0 || weight_foreground == 0 {
            continue;
        }

        let (wb, wf) = (weight_background as f64, weight_foreground as f64);
        let mean_background = sum_background / wb;
        let mean_foreground = (sum_total - sum_background) / wf;
        let variance = wb * wf * (mean_background - mean_foreground).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Pixels strictly above `level` become 255, the rest 0.
pub fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();

    twice_area.abs() as f64 / 2.0
}

fn bounding_box(contour: &Contour<u32>) -> Option<(u32, u32, u32, u32)> {
    let min_x = contour.points.iter().map(|p| p.x).min()?;
    let max_x = contour.points.iter().map(|p| p.x).max()?;
    let min_y = contour.points.iter().map(|p| p.y).min()?;
    let max_y = contour.points.iter().map(|p| p.y).max()?;
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Extract defect regions whose enclosed area is at least `min_area`.
///
/// Regions are returned in contour discovery order (top to bottom, left to
/// right by first boundary pixel).
pub fn extract_regions(map: &SimilarityMap, min_area: u32) -> Vec<DefectRegion> {
    let intensity = map.defect_intensity();
    let level = otsu_level(&intensity);
    let mask = binarize(&intensity, level);

    let contours: Vec<Contour<u32>> = find_contours(&mask);
    let outer = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none());

    let mut regions = Vec::new();
    let mut discarded = 0usize;
    for contour in outer {
        let area = polygon_area(&contour.points);
        if area < f64::from(min_area) || area < 1.0 {
            discarded += 1;
            continue;
        }
        let Some((x, y, width, height)) = bounding_box(contour) else {
            continue;
        };
        regions.push(DefectRegion {
            x,
            y,
            width,
            height,
            area: area as u32,
        });
    }

    debug!(
        otsu_level = level,
        regions = regions.len(),
        discarded,
        min_area,
        "Extracted defect regions"
    );
    regions
}
