//! Intrinsic pixel analyzer
//!
//! Pixel-level evidence that survives metadata stripping: color anomalies,
//! noise uniformity, texture artifacts, GAN frequency fingerprints, JPEG
//! quantization fingerprints, ICC profile provenance, and sensor-noise
//! (PRNU) structure. Sub-check contributions sum into a 0-100 score with
//! `is_ai_intrinsic` at the 50 threshold. Screenshot-tagged inputs skip
//! the sub-checks that assume a camera pipeline (ICC, quantization, PRNU).

mod gan;
mod prnu;
mod profile;
mod quantization;
mod texture;

use super::{AnalysisContext, Detector};
use crate::dsp::{self, Grayscale};
use crate::error::Result;
use crate::loader::CAP_INTRINSIC;
use crate::report::{
    Check, CheckStatus, DetectorData, DetectorId, DetectorReport, IntrinsicSummary,
};
use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, info};

const AI_THRESHOLD: u32 = 50;

/// One sub-check's outcome.
pub(crate) struct SubCheck {
    pub name: &'static str,
    pub score: u32,
    pub notes: Vec<String>,
}

impl SubCheck {
    fn clean(name: &'static str) -> SubCheck {
        SubCheck {
            name,
            score: 0,
            notes: Vec::new(),
        }
    }
}

pub struct IntrinsicAnalyzer;

#[async_trait]
impl Detector for IntrinsicAnalyzer {
    fn id(&self) -> DetectorId {
        DetectorId::Intrinsic
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || run(&ctx))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

fn run(ctx: &AnalysisContext) -> Result<DetectorReport> {
    let view = ctx.image.view(CAP_INTRINSIC)?;
    let is_screenshot = screenshot_indicated(ctx);
    let claimed_camera = ctx.claimed_camera();

    let mut sub_checks = vec![
        check_color_anomalies(&view),
        texture::check_noise_uniformity(&view),
        texture::check_visual_artifacts(&view),
        gan::check_fingerprints(ctx)?,
    ];

    if is_screenshot {
        debug!("screenshot indicated, skipping ICC / quantization / PRNU sub-checks");
    } else {
        sub_checks.push(quantization::check(ctx, claimed_camera));
        sub_checks.push(profile::check(ctx, claimed_camera));
        sub_checks.push(prnu::check(ctx)?);
    }

    let mut total: u32 = 0;
    let mut detection_methods = Vec::new();
    let mut checks = Vec::with_capacity(sub_checks.len());
    for sub in &sub_checks {
        total += sub.score;
        if sub.score > 0 {
            detection_methods.push(sub.name.to_string());
        }
        let status = if sub.score > 0 {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        let reason = if sub.notes.is_empty() {
            "No anomalies".to_string()
        } else {
            sub.notes.join("; ")
        };
        checks.push(Check::new(sub.name, status, sub.score as f64, reason));
    }
    let total = total.min(100);
    let is_ai_intrinsic = total > AI_THRESHOLD;

    if is_ai_intrinsic {
        info!(total, methods = ?detection_methods, "intrinsic analysis flags AI generation");
    }

    let mut report = DetectorReport::new(DetectorId::Intrinsic, total as f64 / 100.0);
    report.checks = checks;
    if is_screenshot {
        report.details.insert("screenshot_mode".into(), "true".into());
    }
    if let Some(summary) = ctx.icc_profile.as_deref().and_then(crate::icc::inspect) {
        if let Some(version) = summary.version {
            report.details.insert("icc_version".into(), version);
        }
        if let Some(date) = summary.creation_date {
            report.details.insert("icc_creation_date".into(), date);
        }
    }
    report.data = DetectorData::Intrinsic {
        summary: IntrinsicSummary {
            is_ai_intrinsic,
            total_score: total,
            detection_methods,
        },
    };
    Ok(report)
}

/// Screenshots have no camera pipeline to fingerprint.
fn screenshot_indicated(ctx: &AnalysisContext) -> bool {
    let software = ctx.tag_lower("Software");
    let user_comment = ctx.tag_lower("UserComment");
    ctx.config
        .tables
        .screenshot_software
        .iter()
        .any(|k| software.contains(k))
        || user_comment.contains("screenshot")
}

/// Color anomalies: oversaturation (with a night-photo exception), overly
/// uniform saturation, pure black/white excess, and implausible channel
/// correlations.
fn check_color_anomalies(view: &RgbImage) -> SubCheck {
    let mut sub = SubCheck::clean("color_anomalies");
    let total_pixels = (view.width() * view.height()) as f64;
    if total_pixels == 0.0 {
        return sub;
    }

    let mut saturation = Vec::with_capacity(total_pixels as usize);
    let mut brightness_sum = 0.0;
    let mut pure_white = 0u64;
    let mut pure_black = 0u64;
    for pixel in view.pixels() {
        let [r, g, b] = pixel.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        saturation.push((max - min) as f64);
        brightness_sum += (r as f64 + g as f64 + b as f64) / 3.0;
        if r == 255 && g == 255 && b == 255 {
            pure_white += 1;
        }
        if r == 0 && g == 0 && b == 0 {
            pure_black += 1;
        }
    }
    let brightness_mean = brightness_sum / total_pixels;

    let sat_mean = dsp::mean(&saturation);
    let sat_std = dsp::std_dev(&saturation);

    if sat_mean > 120.0 {
        if brightness_mean > 120.0 {
            sub.notes.push(format!("High saturation (mean: {sat_mean:.1})"));
            sub.score += 15;
        } else {
            // Night-mode pipelines legitimately boost saturation.
            sub.score += 5;
        }
    }
    if sat_std < 20.0 {
        sub.notes.push(format!("Uniform saturation (std: {sat_std:.1})"));
        sub.score += 15;
    }

    if pure_white as f64 > total_pixels * 0.08 {
        sub.notes.push(format!(
            "Excessive pure white ({:.1}%)",
            100.0 * pure_white as f64 / total_pixels
        ));
        sub.score += 15;
    }
    if pure_black as f64 > total_pixels * 0.05 && brightness_mean > 100.0 {
        sub.notes.push(format!(
            "Excessive pure black ({:.1}%)",
            100.0 * pure_black as f64 / total_pixels
        ));
        sub.score += 25;
    }

    let correlations = channel_correlations(view);
    if let Some([rg, rb, gb]) = correlations {
        let min_corr = rg.min(rb).min(gb);
        if min_corr < 0.15 {
            sub.notes
                .push(format!("Weak color correlation (min: {min_corr:.2})"));
            sub.score += 15;
        }
        if rg > 0.97 && rb > 0.97 && gb > 0.97 {
            sub.notes.push("Unnaturally perfect color correlation".into());
            sub.score += 15;
        }
    }

    sub
}

/// Per-channel correlations over a fixed-stride pixel sample. The stride
/// keeps the sample near 10k pixels and, unlike random sampling, keeps
/// repeated runs byte-identical.
fn channel_correlations(view: &RgbImage) -> Option<[f64; 3]> {
    let total = (view.width() * view.height()) as usize;
    if total < 4 {
        return None;
    }
    let stride = (total / 10_000).max(1);

    let mut r = Vec::with_capacity(total / stride + 1);
    let mut g = Vec::with_capacity(total / stride + 1);
    let mut b = Vec::with_capacity(total / stride + 1);
    for (i, pixel) in view.pixels().enumerate() {
        if i % stride == 0 {
            r.push(pixel.0[0] as f64);
            g.push(pixel.0[1] as f64);
            b.push(pixel.0[2] as f64);
        }
    }

    Some([
        dsp::correlation(&r, &g),
        dsp::correlation(&r, &b),
        dsp::correlation(&g, &b),
    ])
}

/// Shared helper: grayscale of a capped view.
pub(crate) fn gray_view(ctx: &AnalysisContext, cap: u32) -> Result<Grayscale> {
    Ok(Grayscale::from_rgb(&*ctx.image.view(cap)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testctx::context;

    #[test]
    fn flat_gray_image_flags_uniform_saturation_only_in_color_check() {
        let view = RgbImage::from_pixel(64, 64, image::Rgb([120, 120, 120]));
        let sub = check_color_anomalies(&view);
        // Saturation is exactly 0 everywhere: uniform (std < 20).
        assert_eq!(sub.score, 15);
        assert!(sub.notes[0].contains("Uniform saturation"));
    }

    #[test]
    fn pure_white_field_is_penalized() {
        let view = RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
        let sub = check_color_anomalies(&view);
        assert!(sub.notes.iter().any(|n| n.contains("pure white")));
        assert!(sub.score >= 30); // uniform saturation + pure white
    }

    #[test]
    fn dark_frame_is_not_flagged_for_pure_black() {
        let view = RgbImage::from_pixel(64, 64, image::Rgb([0, 0, 0]));
        let sub = check_color_anomalies(&view);
        assert!(!sub.notes.iter().any(|n| n.contains("pure black")));
    }

    #[test]
    fn screenshot_detection_reads_software_and_comment() {
        let via_software = context().tag("Software", "Snipping Tool 11").build();
        assert!(screenshot_indicated(&via_software));

        let via_comment = context().tag("UserComment", "Screenshot").build();
        assert!(screenshot_indicated(&via_comment));

        let camera = context().tag("Software", "17.1").build();
        assert!(!screenshot_indicated(&camera));
    }

    #[test]
    fn screenshot_mode_skips_camera_pipeline_checks() {
        let ctx = context()
            .dims(128, 128)
            .tag("Software", "Snipping Tool 11")
            .build();
        let report = run(&ctx).unwrap();
        let names: Vec<&str> = report.checks.iter().map(|c| c.layer.as_str()).collect();
        assert!(!names.contains(&"jpeg_quantization"));
        assert!(!names.contains(&"icc_profile"));
        assert!(!names.contains(&"prnu"));
        assert_eq!(
            report.details.get("screenshot_mode").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn total_is_clamped_and_thresholded() {
        let ctx = context().dims(128, 128).build();
        let report = run(&ctx).unwrap();
        match report.data {
            DetectorData::Intrinsic { summary } => {
                assert!(summary.total_score <= 100);
                assert_eq!(summary.is_ai_intrinsic, summary.total_score > AI_THRESHOLD);
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }
}
