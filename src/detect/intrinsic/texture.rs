//! Noise-uniformity and texture sub-checks
//!
//! Camera sensor noise varies across a frame with content and exposure;
//! generator noise is injected uniformly. Texture-wise, generators both
//! over-smooth regions and over-draw edges.

use super::SubCheck;
use crate::dsp::{self, Grayscale};
use image::RgbImage;

const NOISE_BLOCK: usize = 32;
const VARIANCE_WINDOW: usize = 16;
/// Sobel magnitude above which a pixel counts as a strong edge.
const EDGE_MAGNITUDE: f64 = 100.0;

/// Block-wise spread of residual noise after a 5x5 smoothing pass.
pub(crate) fn check_noise_uniformity(view: &RgbImage) -> SubCheck {
    let mut sub = SubCheck::clean("noise_patterns");
    let gray = Grayscale::from_rgb(view);
    let (w, h) = (gray.width, gray.height);
    if w < NOISE_BLOCK * 2 || h < NOISE_BLOCK * 2 {
        return sub;
    }

    let smoothed = dsp::box_mean(&gray, 5);
    let residual: Vec<f64> = gray
        .data
        .iter()
        .zip(&smoothed)
        .map(|(v, m)| v - m)
        .collect();

    let mut block_stds = Vec::new();
    let mut y = 0;
    while y + NOISE_BLOCK <= h {
        let mut x = 0;
        while x + NOISE_BLOCK <= w {
            let mut block = Vec::with_capacity(NOISE_BLOCK * NOISE_BLOCK);
            for by in y..y + NOISE_BLOCK {
                block.extend_from_slice(&residual[by * w + x..by * w + x + NOISE_BLOCK]);
            }
            block_stds.push(dsp::std_dev(&block));
            x += NOISE_BLOCK;
        }
        y += NOISE_BLOCK;
    }

    if block_stds.len() > 10 {
        let variation = dsp::std_dev(&block_stds) / (dsp::mean(&block_stds) + 1e-10);
        if variation < 0.10 {
            sub.notes.push(format!(
                "Unnaturally uniform noise (variation: {variation:.3})"
            ));
            sub.score += 20;
        }
    }
    sub
}

/// Smooth-region ratio and strong-edge density.
pub(crate) fn check_visual_artifacts(view: &RgbImage) -> SubCheck {
    let mut sub = SubCheck::clean("visual_artifacts");
    let gray = Grayscale::from_rgb(view);
    let (w, h) = (gray.width, gray.height);
    if w < VARIANCE_WINDOW * 2 || h < VARIANCE_WINDOW * 2 {
        return sub;
    }

    let mut low_variance = 0usize;
    let mut windows = 0usize;
    let mut y = 0;
    while y + VARIANCE_WINDOW <= h {
        let mut x = 0;
        while x + VARIANCE_WINDOW <= w {
            let window = gray.crop(x, y, x + VARIANCE_WINDOW, y + VARIANCE_WINDOW);
            if dsp::variance(&window.data) < 50.0 {
                low_variance += 1;
            }
            windows += 1;
            x += VARIANCE_WINDOW;
        }
        y += VARIANCE_WINDOW;
    }
    if windows > 0 {
        let ratio = low_variance as f64 / windows as f64;
        if ratio > 0.4 {
            sub.notes
                .push(format!("Excessive smooth regions ({:.1}%)", ratio * 100.0));
            sub.score += 20;
        }
    }

    let density = edge_density(&gray);
    if density > 0.20 {
        sub.notes
            .push(format!("Excessive edges ({:.2}%)", density * 100.0));
        sub.score += 15;
    } else if density < 0.01 {
        sub.notes
            .push(format!("Insufficient edges ({:.2}%)", density * 100.0));
        sub.score += 15;
    }

    sub
}

/// Fraction of pixels whose Sobel gradient magnitude marks a strong edge.
fn edge_density(gray: &Grayscale) -> f64 {
    let (w, h) = (gray.width, gray.height);
    if w < 3 || h < 3 {
        return 0.0;
    }
    let mut edges = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (gray.at(x + 1, y - 1) + 2.0 * gray.at(x + 1, y) + gray.at(x + 1, y + 1))
                - (gray.at(x - 1, y - 1) + 2.0 * gray.at(x - 1, y) + gray.at(x - 1, y + 1));
            let gy = (gray.at(x - 1, y + 1) + 2.0 * gray.at(x, y + 1) + gray.at(x + 1, y + 1))
                - (gray.at(x - 1, y - 1) + 2.0 * gray.at(x, y - 1) + gray.at(x + 1, y - 1));
            if (gx * gx + gy * gy).sqrt() > EDGE_MAGNITUDE {
                edges += 1;
            }
        }
    }
    edges as f64 / ((w - 2) * (h - 2)) as f64
}
