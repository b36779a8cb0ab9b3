//! GAN fingerprint sub-check
//!
//! Upsampling stacks leave periodic spikes and band-energy imbalances in
//! the log-spectrum. Sampled at 512px: fingerprints survive downsampling
//! and the DFT stays cheap.

use super::{gray_view, SubCheck};
use crate::detect::AnalysisContext;
use crate::dsp::{self, Spectrum};
use crate::error::Result;
use crate::loader::CAP_PERIODIC_SAMPLING;

/// Contribution ceiling for this sub-check.
const MAX_SCORE: u32 = 40;

pub(crate) fn check_fingerprints(ctx: &AnalysisContext) -> Result<SubCheck> {
    let mut sub = SubCheck::clean("gan_fingerprints");
    let gray = gray_view(ctx, CAP_PERIODIC_SAMPLING)?;
    if gray.width < 32 || gray.height < 32 {
        return Ok(sub);
    }

    let spectrum = Spectrum::compute(&gray);
    let log_spectrum: Vec<f64> = spectrum.magnitude.iter().map(|m| (1.0 + m).ln()).collect();
    let (w, h) = (spectrum.width, spectrum.height);
    let (cx, cy) = spectrum.center();
    let max_dist = ((cx * cx + cy * cy) as f64).sqrt();

    // Band energies: low < 10% of the radius, mid 10-40%, high >= 40%.
    let mut band_sums = [0.0f64; 3];
    let mut band_counts = [0usize; 3];
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx as f64;
            let dy = y as f64 - cy as f64;
            let dist = (dx * dx + dy * dy).sqrt();
            let band = if dist < max_dist * 0.1 {
                0
            } else if dist < max_dist * 0.4 {
                1
            } else {
                2
            };
            band_sums[band] += log_spectrum[y * w + x];
            band_counts[band] += 1;
        }
    }
    let band_mean = |i: usize| {
        if band_counts[i] == 0 {
            0.0
        } else {
            band_sums[i] / band_counts[i] as f64
        }
    };
    let (low, mid, high) = (band_mean(0), band_mean(1), band_mean(2));
    let total = low + mid + high;
    if total > 0.0 {
        let high_ratio = high / total;
        if high_ratio > 0.40 {
            sub.notes.push(format!(
                "Excessive high-frequency energy ({:.1}%)",
                high_ratio * 100.0
            ));
            sub.score += 25;
        } else if high_ratio < 0.08 {
            sub.notes.push(format!(
                "Insufficient high-frequency detail ({:.1}%)",
                high_ratio * 100.0
            ));
            sub.score += 15;
        }
    }

    // Periodic spikes along a ring at 70% radius, every 10 degrees.
    let ring = sample_ring(&log_spectrum, w, h, cx, cy, max_dist * 0.7, 10.0);
    if ring.len() > 10 {
        let mean = dsp::mean(&ring);
        let centered: Vec<f64> = ring.iter().map(|v| v - mean).collect();
        let mut max_autocorr: f64 = 0.0;
        for lag in 2..10.min(centered.len()) {
            max_autocorr = max_autocorr.max(dsp::autocorrelation_at(&centered, lag));
        }
        if max_autocorr > 0.5 {
            sub.notes.push(format!(
                "Periodic frequency patterns detected ({max_autocorr:.2})"
            ));
            sub.score += 25;
        }
    }

    // Azimuthal uniformity: real scenes have directional bias.
    let mut azimuthal = Vec::new();
    let mut angle = 0.0f64;
    while angle < 360.0 {
        let theta = angle.to_radians();
        let mut samples = Vec::new();
        let mut r = 10.0;
        while r < max_dist * 0.8 {
            let px = (cx as f64 + r * theta.cos()) as isize;
            let py = (cy as f64 + r * theta.sin()) as isize;
            if px >= 0 && (px as usize) < w && py >= 0 && (py as usize) < h {
                samples.push(log_spectrum[py as usize * w + px as usize]);
            }
            r += 10.0;
        }
        if !samples.is_empty() {
            azimuthal.push(dsp::mean(&samples));
        }
        angle += 5.0;
    }
    if azimuthal.len() > 20 {
        let mean = dsp::mean(&azimuthal);
        if mean > 0.0 {
            let variation = dsp::std_dev(&azimuthal) / mean;
            if variation < 0.06 {
                sub.notes.push(format!(
                    "Unnaturally uniform frequency distribution ({variation:.3})"
                ));
                sub.score += 20;
            }
        }
    }

    sub.score = sub.score.min(MAX_SCORE);
    Ok(sub)
}

fn sample_ring(
    log_spectrum: &[f64],
    w: usize,
    h: usize,
    cx: usize,
    cy: usize,
    radius: f64,
    step_degrees: f64,
) -> Vec<f64> {
    let mut out = Vec::new();
    let mut angle = 0.0f64;
    while angle < 360.0 {
        let theta = angle.to_radians();
        let px = (cx as f64 + radius * theta.cos()) as isize;
        let py = (cy as f64 + radius * theta.sin()) as isize;
        if px >= 0 && (px as usize) < w && py >= 0 && (py as usize) < h {
            out.push(log_spectrum[py as usize * w + px as usize]);
        }
        angle += step_degrees;
    }
    out
}
