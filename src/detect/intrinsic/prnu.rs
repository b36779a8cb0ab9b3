//! PRNU sensor-noise sub-check
//!
//! Photo-response non-uniformity is the residual left after smoothing a
//! frame: real sensors imprint a weak high-frequency pattern everywhere,
//! at consistent strength across the frame, with a smoothly decaying
//! radial spectrum. Generators lack it, composites mix several of them.

use super::SubCheck;
use crate::detect::AnalysisContext;
use crate::dsp::{self, Grayscale, Spectrum};
use crate::error::Result;
use crate::loader::CAP_SENSOR_NOISE;

const PRESENCE_THRESHOLD: f64 = 0.15;
const CONSISTENCY_THRESHOLD: f64 = 0.25;
const SPLICE_THRESHOLD: f64 = 0.30;
const BLOCK_SIZE: usize = 64;
const SMOOTHING_WINDOW: usize = 5;

pub(crate) fn check(ctx: &AnalysisContext) -> Result<SubCheck> {
    let mut sub = SubCheck::clean("prnu");
    let gray = Grayscale::from_rgb(&*ctx.image.view(CAP_SENSOR_NOISE)?);

    let Some(pattern) = extract_pattern(&gray) else {
        sub.notes.push("Could not extract sensor-noise pattern".into());
        sub.score += 5;
        return Ok(sub);
    };

    // Presence: generator output has no sensor imprint to find.
    let strength = pattern_strength(&pattern);
    if strength < PRESENCE_THRESHOLD {
        sub.notes.push(format!(
            "Weak or missing sensor noise (strength={strength:.3}) - possible AI generation or heavy editing"
        ));
        sub.score += 25;
    }

    // Consistency: splices import foreign noise statistics.
    if gray.width >= BLOCK_SIZE * 2 && gray.height >= BLOCK_SIZE * 2 {
        if let Some(consistency) = block_consistency(&gray) {
            if consistency.score < 1.0 - CONSISTENCY_THRESHOLD {
                sub.notes.push(format!(
                    "Sensor-noise inconsistency (score={:.3}) - possible splice/composite",
                    consistency.score
                ));
                sub.score += 35;
            }
            if consistency.max_deviation > SPLICE_THRESHOLD {
                sub.notes.push(format!(
                    "Extreme sensor-noise deviation in blocks (max={:.3}) - likely splice",
                    consistency.max_deviation
                ));
                sub.score += 45;
            }
        }
    }

    // Naturalness: a real pattern's radial spectrum decays smoothly.
    let naturalness = pattern_naturalness(&pattern);
    if naturalness < 0.3 {
        sub.notes.push(format!(
            "Unnatural noise spectrum (naturalness={naturalness:.3}) - possible synthetic image"
        ));
        sub.score += 20;
    }

    Ok(sub)
}

/// Residual after box smoothing, normalized to zero mean / unit variance.
fn extract_pattern(gray: &Grayscale) -> Option<Grayscale> {
    if gray.width < SMOOTHING_WINDOW * 2 || gray.height < SMOOTHING_WINDOW * 2 {
        return None;
    }
    let smoothed = dsp::box_mean(gray, SMOOTHING_WINDOW);
    let residual: Vec<f64> = gray
        .data
        .iter()
        .zip(&smoothed)
        .map(|(v, m)| v - m)
        .collect();

    let mean = dsp::mean(&residual);
    let std = dsp::std_dev(&residual);
    let normalized = if std > 0.0 {
        residual.iter().map(|v| (v - mean) / std).collect()
    } else {
        residual.iter().map(|v| v - mean).collect()
    };

    Some(Grayscale {
        width: gray.width,
        height: gray.height,
        data: normalized,
    })
}

/// Combined spatial/spectral strength, clipped to [0, 1].
fn pattern_strength(pattern: &Grayscale) -> f64 {
    let std = dsp::std_dev(&pattern.data);

    let spectrum = Spectrum::compute(pattern);
    let (w, h) = (spectrum.width, spectrum.height);
    let (cx, cy) = spectrum.center();

    let mut high = 0.0;
    let mut total = 0.0;
    for y in 0..h {
        for x in 0..w {
            let m = spectrum.at(x, y);
            let power = m * m;
            total += power;
            let in_center = x + w / 4 >= cx && x < cx + w / 4 && y + h / 4 >= cy && y < cy + h / 4;
            if !in_center {
                high += power;
            }
        }
    }
    let high_ratio = high / (total + 1e-10);

    (0.5 * std + 0.5 * high_ratio).clamp(0.0, 1.0)
}

struct Consistency {
    score: f64,
    max_deviation: f64,
}

/// Per-block pattern strengths; their relative variance is the
/// consistency measure.
fn block_consistency(gray: &Grayscale) -> Option<Consistency> {
    let blocks_x = gray.width / BLOCK_SIZE;
    let blocks_y = gray.height / BLOCK_SIZE;
    if blocks_x < 2 || blocks_y < 2 {
        return None;
    }

    let mut strengths = Vec::with_capacity(blocks_x * blocks_y);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let block = gray.crop(
                bx * BLOCK_SIZE,
                by * BLOCK_SIZE,
                (bx + 1) * BLOCK_SIZE,
                (by + 1) * BLOCK_SIZE,
            );
            if let Some(pattern) = extract_pattern(&block) {
                strengths.push(pattern_strength(&pattern));
            }
        }
    }
    if strengths.len() < 4 {
        return None;
    }

    let mean = dsp::mean(&strengths);
    let variance = dsp::variance(&strengths);
    let max_deviation = strengths
        .iter()
        .map(|s| (s - mean).abs())
        .fold(0.0, f64::max);

    let score = if mean > 0.0 {
        1.0 / (1.0 + variance / (mean * mean))
    } else {
        1.0
    };

    Some(Consistency {
        score,
        max_deviation,
    })
}

/// Smoothness of the radial power decay, mapped to (0, 1].
fn pattern_naturalness(pattern: &Grayscale) -> f64 {
    let spectrum = Spectrum::compute(pattern);
    let (cx, cy) = spectrum.center();
    let max_radius = cx.min(cy);
    if max_radius < 15 {
        return 0.5;
    }

    let profile = spectrum.radial_power_profile();
    // 5-pixel radial bins.
    let mut binned = Vec::new();
    let mut r = 0;
    while r < max_radius {
        let end = (r + 5).min(profile.len());
        if r < profile.len() {
            binned.push(dsp::mean(&profile[r..end]));
        }
        r += 5;
    }
    if binned.len() < 3 {
        return 0.5;
    }

    let peak = binned.iter().copied().fold(0.0f64, f64::max);
    if peak > 0.0 {
        for value in &mut binned {
            *value /= peak;
        }
    }

    let gradient: Vec<f64> = binned.windows(2).map(|w| w[1] - w[0]).collect();
    let gradient_variance = dsp::variance(&gradient);
    (1.0 / (1.0 + gradient_variance * 10.0)).clamp(0.0, 1.0)
}
