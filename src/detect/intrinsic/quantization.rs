//! JPEG quantization fingerprint sub-check
//!
//! Every camera ISP ships its own quantization tables; generators and
//! editors re-encode with stock library tables. Cosine similarity against
//! the fingerprint database catches both directions: a claimed camera
//! whose tables do not match, and tables that match a known generator
//! too well. Double compression and out-of-band quality estimates add
//! smaller penalties.

use super::SubCheck;
use crate::config::QuantMatrix;
use crate::detect::AnalysisContext;
use crate::dsp;
use crate::loader::ImageFormat;
use tracing::debug;

/// Similarity below which a claimed camera's tables are a mismatch.
const CAMERA_MATCH_FLOOR: f64 = 0.85;
/// Similarity above which tables are treated as a known AI pattern.
const AI_MATCH_CEILING: f64 = 0.95;

/// Standard IJG luminance table (quality 50), the baseline for quality
/// estimation.
const IJG_BASELINE: QuantMatrix = [
    [16, 11, 10, 16, 24, 40, 51, 61],
    [12, 12, 14, 19, 26, 58, 60, 55],
    [14, 13, 16, 24, 40, 57, 69, 56],
    [14, 17, 22, 29, 51, 87, 80, 62],
    [18, 22, 37, 56, 68, 109, 103, 77],
    [24, 35, 55, 64, 81, 104, 113, 92],
    [49, 64, 78, 87, 103, 121, 120, 101],
    [72, 92, 95, 98, 112, 100, 103, 99],
];

pub(crate) fn check(ctx: &AnalysisContext, claimed_camera: Option<&str>) -> SubCheck {
    let mut sub = SubCheck::clean("jpeg_quantization");

    if !matches!(ctx.image.format, ImageFormat::Jpeg | ImageFormat::Mpo) {
        return sub;
    }

    let Some(luminance) = ctx.qtables.first().map(|t| t.values) else {
        sub.notes.push("Cannot extract quantization tables".into());
        sub.score += 20;
        return sub;
    };

    if let Some(camera) = claimed_camera {
        if let Some(lookup) = ctx.config.quantization.lookup(camera) {
            let similarity = table_similarity(&luminance, &lookup.pattern.luminance);
            debug!(
                camera,
                matched = lookup.model_key,
                similarity,
                "camera fingerprint comparison"
            );
            if similarity <= CAMERA_MATCH_FLOOR {
                sub.notes.push(format!(
                    "Quantization tables don't match {camera} (similarity: {:.1}%)",
                    similarity * 100.0
                ));
                sub.score += 40;
            }
        }
    }

    for (name, pattern) in ctx.config.quantization.ai_patterns() {
        let similarity = table_similarity(&luminance, &pattern.luminance);
        if similarity > AI_MATCH_CEILING {
            sub.notes
                .push(format!("AI generation pattern detected: {name}"));
            sub.score += 50;
            break;
        }
    }

    // Repeated re-encoding flattens the table toward a single value;
    // genuine ISP tables always keep some frequency ramp.
    if table_std(&luminance) < 1.0 {
        sub.notes.push("Double JPEG compression detected".into());
        sub.score += 30;
    }

    let quality = estimate_quality(&luminance);
    if quality < 60 {
        sub.notes
            .push(format!("Low JPEG quality ({quality}%) - suspicious"));
        sub.score += 15;
    } else if quality > 98 {
        sub.notes
            .push(format!("Unusually high quality ({quality}%) - suspicious"));
        sub.score += 10;
    }

    sub
}

/// Cosine similarity of two flattened tables.
fn table_similarity(a: &QuantMatrix, b: &QuantMatrix) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for row in 0..8 {
        for col in 0..8 {
            let va = a[row][col] as f64;
            let vb = b[row][col] as f64;
            dot += va * vb;
            norm_a += va * va;
            norm_b += vb * vb;
        }
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

fn table_std(table: &QuantMatrix) -> f64 {
    let values: Vec<f64> = table.iter().flatten().map(|&v| v as f64).collect();
    dsp::std_dev(&values)
}

/// IJG quality estimate from the mid-band of the luminance table.
fn estimate_quality(table: &QuantMatrix) -> u32 {
    let mut actual = 0.0;
    let mut baseline = 0.0;
    for row in 2..6 {
        for col in 2..6 {
            actual += table[row][col] as f64;
            baseline += IJG_BASELINE[row][col] as f64;
        }
    }
    let scale = actual / baseline;

    let quality = if scale <= 0.0 {
        100.0
    } else if scale < 1.0 {
        50.0 + (1.0 - scale) * 50.0
    } else {
        50.0 / scale
    };
    (quality as u32).clamp(1, 100)
}
