//! Heuristic analyzer: four cheap whole-image checks
//!
//! EXIF richness, local-variance noise, saturation, and gradient entropy.
//! Individually weak, but their confidence-weighted mean is a useful prior
//! the fusion engine weighs against the frequency and metadata evidence.

use super::{AnalysisContext, Detector};
use crate::dsp::{self, Grayscale};
use crate::error::Result;
use crate::report::{
    AiSignatures, Check, CheckStatus, DetectorData, DetectorId, DetectorReport,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Fixed per-check confidences, which double as aggregation weights.
const CONFIDENCE_EXIF: f64 = 0.7;
const CONFIDENCE_NOISE: f64 = 0.75;
const CONFIDENCE_COLOR: f64 = 0.65;
const CONFIDENCE_GRADIENT: f64 = 0.8;

pub struct HeuristicAnalyzer;

#[async_trait]
impl Detector for HeuristicAnalyzer {
    fn id(&self) -> DetectorId {
        DetectorId::Heuristic
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || run(&ctx))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

fn run(ctx: &AnalysisContext) -> Result<DetectorReport> {
    let pixels = ctx.image.pixels()?;
    let gray = Grayscale::from_rgb(pixels);

    let exif_score = check_exif(ctx);
    let noise_score = check_noise(&gray);
    let color_score = check_saturation(&dsp::saturation_channel(pixels));
    let gradient_score = check_gradient_entropy(&gray);

    let checks = vec![
        Check::new(
            "EXIF Metadata",
            pass_fail(exif_score),
            exif_score,
            if exif_score > 0.5 {
                "Missing camera metadata"
            } else {
                "Camera metadata present"
            },
        )
        .with_confidence(CONFIDENCE_EXIF),
        Check::new(
            "Noise Pattern",
            pass_fail(noise_score),
            noise_score,
            if noise_score > 0.5 {
                "Unnaturally clean image"
            } else {
                "Natural noise detected"
            },
        )
        .with_confidence(CONFIDENCE_NOISE),
        Check::new(
            "Color Distribution",
            pass_fail(color_score),
            color_score,
            if color_score > 0.5 {
                "Unnatural color saturation"
            } else {
                "Natural color range"
            },
        )
        .with_confidence(CONFIDENCE_COLOR),
        Check::new(
            "Gradient Smoothness",
            pass_fail(gradient_score),
            gradient_score,
            if gradient_score > 0.5 {
                "Over-smoothed gradients"
            } else {
                "Natural texture variation"
            },
        )
        .with_confidence(CONFIDENCE_GRADIENT),
    ];

    let weight_sum = CONFIDENCE_EXIF + CONFIDENCE_NOISE + CONFIDENCE_COLOR + CONFIDENCE_GRADIENT;
    let score = (exif_score * CONFIDENCE_EXIF
        + noise_score * CONFIDENCE_NOISE
        + color_score * CONFIDENCE_COLOR
        + gradient_score * CONFIDENCE_GRADIENT)
        / weight_sum;

    debug!(score, "heuristic analysis complete");

    let mut report = DetectorReport::new(DetectorId::Heuristic, score);
    report.checks = checks;
    report
        .details
        .insert("primary_reason".into(), primary_reason(score).into());
    report.data = DetectorData::Heuristic {
        ai_signatures: AiSignatures {
            unknown_ai: score > 0.6,
            ..Default::default()
        },
    };
    Ok(report)
}

fn pass_fail(score: f64) -> CheckStatus {
    if score > 0.5 {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    }
}

fn primary_reason(score: f64) -> &'static str {
    if score > 0.7 {
        "Multiple AI generation indicators detected"
    } else if score > 0.5 {
        "Some suspicious patterns found"
    } else if score < 0.3 {
        "Strong indicators of real photograph"
    } else {
        "Mixed signals, unclear origin"
    }
}

/// Real camera photos carry rich EXIF; generators rarely bother.
fn check_exif(ctx: &AnalysisContext) -> f64 {
    if ctx.exif.len() < 3 {
        return 0.8;
    }
    let has_camera_info = ["Make", "Model", "Software"]
        .iter()
        .any(|tag| ctx.exif.contains_key(*tag));
    if has_camera_info {
        0.1
    } else {
        0.6
    }
}

/// Mean local variance over 3x3 windows; sensors are noisy, generators
/// are clean.
fn check_noise(gray: &Grayscale) -> f64 {
    let avg_variance = dsp::mean_local_variance(gray, 3);
    if avg_variance < 5.0 {
        0.9
    } else if avg_variance < 15.0 {
        0.7
    } else if avg_variance > 50.0 {
        0.1
    } else {
        0.4
    }
}

fn check_saturation(saturation: &[f64]) -> f64 {
    let avg = dsp::mean(saturation);
    if avg > 180.0 {
        0.8
    } else if avg < 30.0 {
        0.7
    } else if avg > 80.0 && avg < 140.0 {
        0.2
    } else {
        0.4
    }
}

/// Entropy of a 50-bin gradient-magnitude histogram. Natural texture is
/// broad-band; synthesized gradients concentrate.
fn check_gradient_entropy(gray: &Grayscale) -> f64 {
    let (w, h) = (gray.width, gray.height);
    if w < 2 || h < 2 {
        return 0.5;
    }

    let mut magnitudes = Vec::with_capacity((w - 1) * (h - 1));
    for y in 0..h - 1 {
        for x in 0..w - 1 {
            let gx = gray.at(x + 1, y) - gray.at(x, y);
            let gy = gray.at(x, y + 1) - gray.at(x, y);
            magnitudes.push((gx * gx + gy * gy).sqrt());
        }
    }

    let entropy = histogram_entropy(&magnitudes, 50);
    if entropy < 3.0 {
        0.9
    } else if entropy < 4.0 {
        0.7
    } else if entropy > 4.8 {
        0.1
    } else {
        0.4
    }
}

fn histogram_entropy(values: &[f64], bins: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return 0.0;
    }

    let mut counts = vec![0usize; bins];
    let scale = bins as f64 / (max - min);
    for &v in values {
        let bin = (((v - min) * scale) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    let total = values.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
