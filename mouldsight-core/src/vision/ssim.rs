//! Windowed structural similarity (SSIM).
//!
//! Each output pixel compares the `window x window` neighbourhoods of the two
//! images (reflected at the borders) by luminance, contrast and structure:
//!
//! ```text
//! SSIM = (2·μx·μy + C1)(2·σxy + C2) / ((μx² + μy² + C1)(σx² + σy² + C2))
//! ```
//!
//! with `C1 = (0.01·255)²`, `C2 = (0.03·255)²` and sample (N-1) variances.
//! The global score is the mean of the map with a border of `window / 2`
//! pixels excluded. Window sums are accumulated as exact integers, so two
//! identical images score exactly 1.0.

use image::{GrayImage, Luma};

use crate::config::MAX_SSIM_WINDOW;
use crate::error::{InspectionError, Result};

const DATA_RANGE: f64 = 255.0;
const C1: f64 = (0.01 * DATA_RANGE) * (0.01 * DATA_RANGE);
const C2: f64 = (0.03 * DATA_RANGE) * (0.03 * DATA_RANGE);

/// Per-pixel similarity values plus their cropped mean.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMap {
    width: u32,
    height: u32,
    values: Vec<f64>,
    score: f64,
}

impl SimilarityMap {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Mean similarity, clamped to [0, 1].
    pub fn score(&self) -> f64 {
        self.score.clamp(0.0, 1.0)
    }

    /// Score as a percentage rounded to two decimals.
    pub fn percentage(&self) -> f64 {
        (self.score() * 100.0 * 100.0).round() / 100.0
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Dissimilarity as an 8-bit image: identical pixels are 0, the most
    /// dissimilar are 255.
    pub fn defect_intensity(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.values[y as usize * self.width as usize + x as usize];
            let similarity = (value.clamp(0.0, 1.0) * DATA_RANGE) as u8;
            Luma([u8::MAX - similarity])
        })
    }
}

/// Running window sums for one padded column.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    x: u64,
    y: u64,
    xx: u64,
    yy: u64,
    xy: u64,
}

impl Moments {
    fn of(a: u8, b: u8) -> Self {
        let (a, b) = (u64::from(a), u64::from(b));
        Self {
            x: a,
            y: b,
            xx: a * a,
            yy: b * b,
            xy: a * b,
        }
    }

    fn add(&mut self, other: &Self) {
        self.x += other.x;
        self.y += other.y;
        self.xx += other.xx;
        self.yy += other.yy;
        self.xy += other.xy;
    }

    fn sub(&mut self, other: &Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.xx -= other.xx;
        self.yy -= other.yy;
        self.xy -= other.xy;
    }

    fn ssim(&self, n: i64) -> f64 {
        // n * sum(x²) exceeds i64 for large saturated windows
        let n = i128::from(n);
        let (sx, sy) = (i128::from(self.x), i128::from(self.y));
        let nf = n as f64;
        let norm = (n * (n - 1)) as f64;

        let ux = sx as f64 / nf;
        let uy = sy as f64 / nf;
        let vx = (n * i128::from(self.xx) - sx * sx) as f64 / norm;
        let vy = (n * i128::from(self.yy) - sy * sy) as f64 / norm;
        let vxy = (n * i128::from(self.xy) - sx * sy) as f64 / norm;

        let numerator = (2.0 * ux * uy + C1) * (2.0 * vxy + C2);
        let denominator = (ux * ux + uy * uy + C1) * (vx + vy + C2);
        numerator / denominator
    }
}

/// Mirror an out-of-range index back into `0..len`, repeating the edge pixel.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let mirrored = if index < 0 {
        -index - 1
    } else if index >= len {
        2 * len - 1 - index
    } else {
        index
    };
    mirrored as usize
}

/// Compute the SSIM map of two equally sized luma images.
///
/// Fails when the sizes differ, the window is even or outside
/// `3..=MAX_SSIM_WINDOW`, or either dimension is smaller than the window.
pub fn structural_similarity(
    reference: &GrayImage,
    candidate: &GrayImage,
    window: u32,
) -> Result<SimilarityMap> {
    if reference.dimensions() != candidate.dimensions() {
        return Err(InspectionError::Processing(format!(
            "image dimensions differ: {:?} vs {:?}",
            reference.dimensions(),
            candidate.dimensions()
        )));
    }
    if window < 3 || window % 2 == 0 || window > MAX_SSIM_WINDOW {
        return Err(InspectionError::Processing(format!(
            "SSIM window must be odd and between 3 and {MAX_SSIM_WINDOW}, got {window}"
        )));
    }

    let (width, height) = reference.dimensions();
    if width < window || height < window {
        return Err(InspectionError::Processing(format!(
            "image {width}x{height} is smaller than the {window}x{window} SSIM window"
        )));
    }

    let (w, h) = (width as usize, height as usize);
    let radius = (window / 2) as usize;
    let span = window as usize;
    let n = (span * span) as i64;

    let ref_pixels = reference.as_raw();
    let cand_pixels = candidate.as_raw();

    let padded_cols: Vec<usize> = (0..w + 2 * radius)
        .map(|c| reflect(c as isize - radius as isize, w))
        .collect();
    let padded_rows: Vec<usize> = (0..h + 2 * radius)
        .map(|r| reflect(r as isize - radius as isize, h))
        .collect();

    let row_moments = |row: usize| -> Vec<Moments> {
        let offset = row * w;
        padded_cols
            .iter()
            .map(|&col| Moments::of(ref_pixels[offset + col], cand_pixels[offset + col]))
            .collect()
    };

    // Vertical window sums per padded column
    let mut columns = vec![Moments::default(); padded_cols.len()];
    for &row in &padded_rows[..span] {
        for (sum, m) in columns.iter_mut().zip(row_moments(row)) {
            sum.add(&m);
        }
    }

    let mut values = Vec::with_capacity(w * h);
    for y in 0..h {
        if y > 0 {
            let leaving = row_moments(padded_rows[y - 1]);
            let entering = row_moments(padded_rows[y + span - 1]);
            for ((sum, out), inc) in columns.iter_mut().zip(&leaving).zip(&entering) {
                sum.sub(out);
                sum.add(inc);
            }
        }

        let mut window_sum = Moments::default();
        for column in &columns[..span] {
            window_sum.add(column);
        }

        for x in 0..w {
            if x > 0 {
                window_sum.sub(&columns[x - 1]);
                window_sum.add(&columns[x + span - 1]);
            }
            values.push(window_sum.ssim(n));
        }
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for y in radius..h - radius {
        let row = &values[y * w + radius..y * w + w - radius];
        total += row.iter().sum::<f64>();
        count += row.len();
    }
    let score = if count == 0 { 1.0 } else { total / count as f64 };

    Ok(SimilarityMap {
        width,
        height,
        values,
        score,
    })
}
