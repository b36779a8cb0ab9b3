//! Face-swap analyzer
//!
//! Composited faces betray themselves at the seams: boundary-strip
//! spectra, face-vs-neck color histograms, lighting gradient direction,
//! and the compression gap between the face and its surroundings. Each
//! detected face is scored independently; the detector reports the worst
//! one. With no face detector installed, a coarse central box runs the
//! same checks at reduced weight.

use super::{AnalysisContext, Detector};
use crate::collaborators::FaceBox;
use crate::dsp::{self, Grayscale, Spectrum};
use crate::error::Result;
use crate::loader::CAP_FREQUENCY;
use crate::report::{
    Check, CheckStatus, DetectorData, DetectorId, DetectorReport, FaceArtifacts,
};
use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, info};

const CONFIDENCE_BOUNDARY: f64 = 0.85;
const CONFIDENCE_COLOR: f64 = 0.75;
const CONFIDENCE_LIGHTING: f64 = 0.70;
const CONFIDENCE_COMPRESSION: f64 = 0.80;

const ANOMALY_THRESHOLD: f64 = 0.6;
const BOUNDARY_STRIP: u32 = 10;
const BACKGROUND_MARGIN: u32 = 20;

pub struct FaceSwapAnalyzer;

#[async_trait]
impl Detector for FaceSwapAnalyzer {
    fn id(&self) -> DetectorId {
        DetectorId::FaceSwap
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || run(&ctx))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

fn run(ctx: &AnalysisContext) -> Result<DetectorReport> {
    let view = ctx.image.view(CAP_FREQUENCY)?;
    let faces = ctx.collaborators.faces.detect_faces(&view);

    if faces.is_empty() {
        debug!("no faces detected, skipping face-swap analysis");
        let mut report = DetectorReport::new(DetectorId::FaceSwap, 0.0);
        report.data = DetectorData::FaceSwap {
            faces_detected: 0,
            artifacts: FaceArtifacts::default(),
        };
        return Ok(report);
    }

    let gray = Grayscale::from_rgb(&view);
    let mut checks = Vec::with_capacity(faces.len() * 4);
    let mut artifacts = FaceArtifacts::default();
    let mut best_score: f64 = 0.0;

    for (index, face) in faces.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return Err(crate::error::Error::DetectorFailed(
                "cancelled during face analysis".into(),
            ));
        }
        let n = index + 1;

        let boundary = check_boundary_spectrum(&gray, face);
        let color = check_color_consistency(&view, face);
        let lighting = check_lighting(&gray, face);
        let compression = check_compression_gap(&gray, face);

        checks.push(
            Check::new(
                format!("Face {n} Boundary FFT"),
                status(boundary),
                boundary,
                reason(boundary, "Swap artifacts on face boundary", "Clean face boundaries"),
            )
            .with_confidence(CONFIDENCE_BOUNDARY),
        );
        checks.push(
            Check::new(
                format!("Face {n} Color Consistency"),
                status(color),
                color,
                reason(color, "Color mismatch (face vs skin)", "Natural color consistency"),
            )
            .with_confidence(CONFIDENCE_COLOR),
        );
        checks.push(
            Check::new(
                format!("Face {n} Lighting"),
                status(lighting),
                lighting,
                reason(lighting, "Inconsistent lighting on face", "Natural lighting"),
            )
            .with_confidence(CONFIDENCE_LIGHTING),
        );
        checks.push(
            Check::new(
                format!("Face {n} Compression"),
                status(compression),
                compression,
                reason(compression, "Mismatched compression artifacts", "Uniform compression"),
            )
            .with_confidence(CONFIDENCE_COMPRESSION),
        );

        artifacts.boundary_artifacts |= boundary > ANOMALY_THRESHOLD;
        artifacts.color_mismatch |= color > ANOMALY_THRESHOLD;
        artifacts.lighting_inconsistent |= lighting > ANOMALY_THRESHOLD;
        artifacts.compression_mismatch |= compression > ANOMALY_THRESHOLD;

        let weight_sum =
            CONFIDENCE_BOUNDARY + CONFIDENCE_COLOR + CONFIDENCE_LIGHTING + CONFIDENCE_COMPRESSION;
        let mut face_score = (boundary * CONFIDENCE_BOUNDARY
            + color * CONFIDENCE_COLOR
            + lighting * CONFIDENCE_LIGHTING
            + compression * CONFIDENCE_COMPRESSION)
            / weight_sum;
        // The coarse central fallback is not a face detection; weight its
        // evidence by the low confidence it carries.
        if face.coarse_fallback {
            face_score *= face.confidence;
        }
        best_score = best_score.max(face_score);
    }

    info!(
        faces = faces.len(),
        score = best_score,
        "face-swap analysis complete"
    );

    let mut report = DetectorReport::new(DetectorId::FaceSwap, best_score);
    report.checks = checks;
    report.data = DetectorData::FaceSwap {
        faces_detected: faces.len(),
        artifacts,
    };
    Ok(report)
}

fn status(score: f64) -> CheckStatus {
    if score > ANOMALY_THRESHOLD {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    }
}

fn reason(score: f64, anomalous: &'static str, clean: &'static str) -> &'static str {
    if score > ANOMALY_THRESHOLD {
        anomalous
    } else {
        clean
    }
}

/// High-frequency energy of the strip above the face's top edge; blending
/// seams concentrate energy there.
fn check_boundary_spectrum(gray: &Grayscale, face: &FaceBox) -> f64 {
    let y1 = face.y1.saturating_sub(BOUNDARY_STRIP) as usize;
    let y2 = ((face.y1 + BOUNDARY_STRIP) as usize).min(gray.height);
    let strip = gray.crop(face.x1 as usize, y1, face.x2 as usize, y2);
    if strip.width < 4 || strip.height < 2 {
        return 0.5;
    }

    let spectrum = Spectrum::compute(&strip);
    let (cx, cy) = spectrum.center();
    let Some(ratio) = spectrum.high_frequency_ratio(0.7 * cx.min(cy) as f64) else {
        return 0.5;
    };

    if ratio > 0.30 {
        0.85
    } else if ratio > 0.20 {
        0.65
    } else if ratio < 0.10 {
        0.15
    } else {
        0.40
    }
}

/// Chi-square distance between 32-bin per-channel histograms of the face
/// and the strip of skin below it.
fn check_color_consistency(view: &RgbImage, face: &FaceBox) -> f64 {
    let height = view.height();
    let face_h = face.y2.saturating_sub(face.y1);
    let neck_y1 = face.y2.min(height.saturating_sub(1));
    let neck_y2 = (face.y2 + face_h / 3).min(height);
    if neck_y2 <= neck_y1 || face.x2 <= face.x1 || face.y2 <= face.y1 {
        return 0.5;
    }

    let face_hists = channel_histograms(view, face.x1, face.y1, face.x2, face.y2);
    let neck_hists = channel_histograms(view, face.x1, neck_y1, face.x2, neck_y2);
    let (Some(face_hists), Some(neck_hists)) = (face_hists, neck_hists) else {
        return 0.5;
    };

    let mut distance = 0.0;
    for channel in 0..3 {
        distance += chi_square(&face_hists[channel], &neck_hists[channel]);
    }
    let avg = distance / 3.0;

    if avg > 0.5 {
        0.85
    } else if avg > 0.3 {
        0.65
    } else if avg < 0.15 {
        0.20
    } else {
        0.45
    }
}

fn channel_histograms(
    view: &RgbImage,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
) -> Option<[Vec<f64>; 3]> {
    let x2 = x2.min(view.width());
    let y2 = y2.min(view.height());
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let mut hists = [vec![0.0; 32], vec![0.0; 32], vec![0.0; 32]];
    for y in y1..y2 {
        for x in x1..x2 {
            let pixel = view.get_pixel(x, y);
            for channel in 0..3 {
                hists[channel][(pixel.0[channel] / 8) as usize] += 1.0;
            }
        }
    }
    let total = ((x2 - x1) * (y2 - y1)) as f64;
    for hist in &mut hists {
        for bin in hist.iter_mut() {
            *bin /= total;
        }
    }
    Some(hists)
}

fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&p, &q)| {
            let diff = p - q;
            diff * diff / (p + q + 1e-10)
        })
        .sum()
}

/// Ratio of vertical to horizontal gradient magnitudes over the face.
/// Strongly one-directional shading reads as relit or pasted.
fn check_lighting(gray: &Grayscale, face: &FaceBox) -> f64 {
    let region = gray.crop(
        face.x1 as usize,
        face.y1 as usize,
        face.x2 as usize,
        face.y2 as usize,
    );
    if region.width < 2 || region.height < 2 {
        return 0.5;
    }

    let mut sum_gx = 0.0;
    let mut sum_gy = 0.0;
    let mut count = 0usize;
    for y in 0..region.height - 1 {
        for x in 0..region.width - 1 {
            sum_gx += (region.at(x + 1, y) - region.at(x, y)).abs();
            sum_gy += (region.at(x, y + 1) - region.at(x, y)).abs();
            count += 1;
        }
    }
    if count == 0 {
        return 0.5;
    }
    let mean_gx = sum_gx / count as f64;
    let mean_gy = sum_gy / count as f64;
    let ratio = mean_gx.max(mean_gy) / (mean_gx.min(mean_gy) + 1e-10);

    if ratio > 5.0 {
        0.80
    } else if ratio > 3.0 {
        0.60
    } else if ratio < 2.0 {
        0.20
    } else {
        0.40
    }
}

/// Variance gap between the face and a margin of background around it.
/// A pasted face carries its own compression history.
fn check_compression_gap(gray: &Grayscale, face: &FaceBox) -> f64 {
    let face_region = gray.crop(
        face.x1 as usize,
        face.y1 as usize,
        face.x2 as usize,
        face.y2 as usize,
    );
    let background = gray.crop(
        face.x1.saturating_sub(BACKGROUND_MARGIN) as usize,
        face.y1.saturating_sub(BACKGROUND_MARGIN) as usize,
        (face.x2 + BACKGROUND_MARGIN) as usize,
        (face.y2 + BACKGROUND_MARGIN) as usize,
    );
    if face_region.data.is_empty() || background.data.is_empty() {
        return 0.5;
    }

    let face_var = dsp::variance(&face_region.data);
    let bg_var = dsp::variance(&background.data);
    if bg_var <= 0.0 {
        return 0.5;
    }
    let ratio = (face_var - bg_var).abs() / bg_var;

    if ratio > 0.5 {
        0.80
    } else if ratio > 0.3 {
        0.60
    } else if ratio < 0.15 {
        0.20
    } else {
        0.40
    }
}
