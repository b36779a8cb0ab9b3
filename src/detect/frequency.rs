//! Frequency-domain analyzer
//!
//! One 2-D DFT over the grayscale working view feeds four checks: the
//! 8-pixel JPEG grid periodicity, the high-frequency energy ratio, the
//! power-law slope of the radial spectrum, and the peak structure of the
//! log-spectrum. Natural photographs have a recognizable spectral
//! signature; generator output tends to be too smooth, too spiky, or both.

use super::{AnalysisContext, Detector};
use crate::dsp::{self, Grayscale, Spectrum};
use crate::error::Result;
use crate::loader::CAP_FREQUENCY;
use crate::report::{
    Check, CheckStatus, DetectorData, DetectorId, DetectorReport, SpectralAnomalies,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const CONFIDENCE_JPEG_GRID: f64 = 0.85;
const CONFIDENCE_HIGH_FREQ: f64 = 0.80;
const CONFIDENCE_POWER_LAW: f64 = 0.75;
const CONFIDENCE_PEAKS: f64 = 0.70;

/// A check scores as anomalous above this threshold.
const ANOMALY_THRESHOLD: f64 = 0.6;

pub struct FrequencyAnalyzer;

#[async_trait]
impl Detector for FrequencyAnalyzer {
    fn id(&self) -> DetectorId {
        DetectorId::Frequency
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || run(&ctx))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

fn run(ctx: &AnalysisContext) -> Result<DetectorReport> {
    let view = ctx.image.view(CAP_FREQUENCY)?;
    let gray = Grayscale::from_rgb(&view);
    let spectrum = Spectrum::compute(&gray);

    let jpeg_score = check_jpeg_grid(&spectrum);
    let hf_score = check_high_frequency(&spectrum);
    let slope_score = check_power_law(&spectrum);
    let peak_score = check_periodic_peaks(&spectrum);

    let checks = vec![
        Check::new(
            "JPEG Artifacts",
            status(jpeg_score),
            jpeg_score,
            if jpeg_score > ANOMALY_THRESHOLD {
                "Missing JPEG compression patterns"
            } else {
                "Normal JPEG artifacts detected"
            },
        )
        .with_confidence(CONFIDENCE_JPEG_GRID),
        Check::new(
            "High-Frequency Analysis",
            status(hf_score),
            hf_score,
            if hf_score > ANOMALY_THRESHOLD {
                "Unnatural high-frequency patterns"
            } else {
                "Natural frequency distribution"
            },
        )
        .with_confidence(CONFIDENCE_HIGH_FREQ),
        Check::new(
            "Power Spectrum",
            status(slope_score),
            slope_score,
            if slope_score > ANOMALY_THRESHOLD {
                "Anomalous spectral distribution"
            } else {
                "Natural power spectrum"
            },
        )
        .with_confidence(CONFIDENCE_POWER_LAW),
        Check::new(
            "Periodic Patterns",
            status(peak_score),
            peak_score,
            if peak_score > ANOMALY_THRESHOLD {
                "Artificial periodic artifacts"
            } else {
                "No artificial periodicities"
            },
        )
        .with_confidence(CONFIDENCE_PEAKS),
    ];

    let weight_sum =
        CONFIDENCE_JPEG_GRID + CONFIDENCE_HIGH_FREQ + CONFIDENCE_POWER_LAW + CONFIDENCE_PEAKS;
    let score = (jpeg_score * CONFIDENCE_JPEG_GRID
        + hf_score * CONFIDENCE_HIGH_FREQ
        + slope_score * CONFIDENCE_POWER_LAW
        + peak_score * CONFIDENCE_PEAKS)
        / weight_sum;

    debug!(score, jpeg_score, hf_score, slope_score, peak_score, "frequency analysis complete");

    let mut report = DetectorReport::new(DetectorId::Frequency, score);
    report.checks = checks;
    report.data = DetectorData::Frequency {
        spectral_anomalies: SpectralAnomalies {
            jpeg_artifacts_missing: jpeg_score > ANOMALY_THRESHOLD,
            high_freq_anomaly: hf_score > ANOMALY_THRESHOLD,
            power_spectrum_anomaly: slope_score > ANOMALY_THRESHOLD,
            periodic_patterns: peak_score > ANOMALY_THRESHOLD,
        },
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

/// JPEG's 8x8 block grid leaves peaks at 8-pixel lags along the DC row
/// and column. Their absence is what's suspicious.
fn check_jpeg_grid(spectrum: &Spectrum) -> f64 {
    let (cx, cy) = spectrum.center();

    let row: Vec<f64> = (0..spectrum.width).map(|x| spectrum.at(x, cy)).collect();
    let column: Vec<f64> = (0..spectrum.height).map(|y| spectrum.at(cx, y)).collect();

    let periodicity_of = |signal: &[f64]| {
        if signal.len() <= 32 {
            return 0.0;
        }
        (dsp::autocorrelation_at(signal, 8) + dsp::autocorrelation_at(signal, 16)) / 2.0
    };

    let avg_periodicity = (periodicity_of(&row) + periodicity_of(&column)) / 2.0;
    if avg_periodicity > 0.30 {
        0.1
    } else if avg_periodicity > 0.15 {
        0.4
    } else {
        0.8
    }
}

/// Energy fraction beyond 70% of the usable radius. Too little means
/// over-smoothing; too much means upsampling artifacts.
fn check_high_frequency(spectrum: &Spectrum) -> f64 {
    let (cx, cy) = spectrum.center();
    let radius = 0.7 * cx.min(cy) as f64;

    let Some(ratio) = spectrum.high_frequency_ratio(radius) else {
        return 0.5;
    };

    if ratio < 0.03 {
        0.85
    } else if ratio > 0.25 {
        0.75
    } else if (0.05..=0.20).contains(&ratio) {
        0.15
    } else {
        0.5
    }
}

/// Natural images follow a 1/f^2 power law; the slope of log-power over
/// log-frequency should sit near -2.
fn check_power_law(spectrum: &Spectrum) -> f64 {
    let (cx, cy) = spectrum.center();
    let max_radius = cx.min(cy);
    let profile = spectrum.radial_power_profile();
    if max_radius < 2 || profile.len() < 2 {
        return 0.5;
    }
    let usable = &profile[1..max_radius.min(profile.len())];
    if usable.len() < 10 {
        return 0.5;
    }

    let log_freq: Vec<f64> = (1..=usable.len()).map(|f| (f as f64).ln()).collect();
    let log_power: Vec<f64> = usable.iter().map(|p| (p + 1e-10).ln()).collect();
    let slope = dsp::linear_slope(&log_freq, &log_power);

    if slope > -2.5 && slope < -1.5 {
        0.1
    } else if slope > -3.0 && slope < -1.0 {
        0.4
    } else {
        0.8
    }
}

/// Coefficient of variation of the log-spectrum outside the DC block.
/// Many strong peaks point at upsampling artifacts; a too-uniform
/// spectrum points at synthetic smoothing.
fn check_periodic_peaks(spectrum: &Spectrum) -> f64 {
    let (cx, cy) = spectrum.center();

    let mut values = Vec::with_capacity(spectrum.width * spectrum.height);
    for y in 0..spectrum.height {
        for x in 0..spectrum.width {
            let in_dc_block =
                x + 10 >= cx && x < cx + 10 && y + 10 >= cy && y < cy + 10;
            if !in_dc_block {
                values.push((spectrum.at(x, y) + 1.0).ln());
            }
        }
    }

    let mean = dsp::mean(&values);
    if mean <= 0.0 {
        return 0.5;
    }
    let cv = dsp::std_dev(&values) / mean;

    if cv > 1.0 {
        0.85
    } else if cv < 0.3 {
        0.75
    } else if (0.4..=0.8).contains(&cv) {
        0.15
    } else {
        0.5
    }
}
