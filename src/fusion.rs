//! Fusion / verdict engine
//!
//! Reduces the detector reports to one verdict. The override cascade runs
//! first, in a fixed order, so decisive evidence (visible watermarks,
//! embedded credentials, definitive metadata findings) short-circuits the
//! statistics. Otherwise a weighted composite of the heuristic, frequency,
//! metadata, and face-swap scores is banded into a verdict, after
//! trusted-software relief and the good-metadata bonus. All band
//! boundaries are strict on the upper side (`combined > x`). Terminal
//! detector slots are neutral and can never trigger an override; if every
//! slot is terminal the verdict is inconclusive.

use crate::exif::ExifMap;
use crate::report::{
    DetectorData, DetectorId, DetectorReport, RedFlag, Severity, TrustLevel, ValidatorReport,
    Verdict, VerdictStatus,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Composite weights.
const WEIGHT_HEURISTIC: f64 = 0.35;
const WEIGHT_FREQUENCY: f64 = 0.30;
const WEIGHT_METADATA: f64 = 0.25;
const WEIGHT_FACE_SWAP: f64 = 0.10;

/// Reduction applied to the metadata risk when trusted software is
/// recognized.
const TRUSTED_SOFTWARE_RELIEF: f64 = 0.30;

pub fn decide(reports: &BTreeMap<DetectorId, DetectorReport>, exif: &ExifMap) -> Verdict {
    if !reports.is_empty() && reports.values().all(|r| r.is_terminal()) {
        return Verdict {
            status: VerdictStatus::Inconclusive,
            confidence: 0.5,
            reason: "analysis_failed".into(),
        };
    }

    // Override 1 + 2: visible watermark text.
    if let Some(hit) = visual_watermark_hit(reports) {
        if hit.watermark_type == "ai_generator" {
            return Verdict {
                status: VerdictStatus::AiGenerated,
                confidence: hit.confidence.max(0.98),
                reason: format!(
                    "AI generator watermark detected: {} ({})",
                    hit.provider, hit.text_found
                ),
            };
        }
        if hit.watermark_type == "stock_photo" {
            return Verdict {
                status: VerdictStatus::Manipulated,
                confidence: 0.90,
                reason: format!(
                    "Stock photo watermark detected: {} - unlicensed use",
                    hit.provider
                ),
            };
        }
    }

    // Override 3: embedded content credentials.
    if let Some(probe) = crypto_probe(reports) {
        if probe.0 {
            return Verdict {
                status: VerdictStatus::AiGenerated,
                confidence: probe.1.max(0.95),
                reason: format!("Digital watermark detected ({})", probe.2),
            };
        }
    }

    let validation = validator_report(reports);

    // Override 4 + 5: definitive metadata findings.
    for flag in &validation.red_flags {
        if flag.severity != Severity::Critical {
            continue;
        }
        let reason_lower = flag.reason.to_lowercase();
        if (reason_lower.contains("ai") || reason_lower.contains("google ai"))
            && !flag.requires_visual_proof.unwrap_or(false)
        {
            return Verdict {
                status: VerdictStatus::AiGenerated,
                confidence: 0.98,
                reason: flag.reason.clone(),
            };
        }
        if reason_lower.contains("screenshot") {
            return Verdict {
                status: VerdictStatus::Manipulated,
                confidence: 0.95,
                reason: "Screenshot detected - not original photo".into(),
            };
        }
    }

    // Override 6: the fraud score alone is decisive.
    let fraud_score = validation.fraud_score;
    if fraud_score >= 80 {
        let status = if fraud_score >= 90 {
            VerdictStatus::AiGenerated
        } else {
            VerdictStatus::Manipulated
        };
        let confidence = (fraud_score as f64 / 100.0).min(0.98);
        info!(fraud_score, ?status, "fraud score override");
        return Verdict {
            status,
            confidence,
            reason: fraud_reason(fraud_score, &validation.red_flags),
        };
    }

    weighted_verdict(reports, &validation, exif)
}

fn weighted_verdict(
    reports: &BTreeMap<DetectorId, DetectorReport>,
    validation: &ValidatorReport,
    exif: &ExifMap,
) -> Verdict {
    let heuristic = score_of(reports, DetectorId::Heuristic);
    let frequency = score_of(reports, DetectorId::Frequency);
    let (face_swap, faces_detected) = face_swap_outcome(reports);

    let mut metadata_risk = validation.fraud_score as f64 / 100.0;
    let trusted_software = validation
        .red_flags
        .iter()
        .any(|f| matches!(f.trust_level, Some(TrustLevel::High) | Some(TrustLevel::Medium)));
    if trusted_software {
        metadata_risk = (metadata_risk - TRUSTED_SOFTWARE_RELIEF).max(0.0);
        debug!(
            fraud_score = validation.fraud_score,
            metadata_risk, "trusted software relief applied"
        );
    }

    let stock_photo = metadata_checks_mention_stock(reports);

    let mut combined = heuristic * WEIGHT_HEURISTIC
        + frequency * WEIGHT_FREQUENCY
        + metadata_risk * WEIGHT_METADATA;
    if faces_detected > 0 {
        combined += face_swap * WEIGHT_FACE_SWAP;
    }

    let camera_present = ["Make", "Model"]
        .iter()
        .any(|k| exif.get(*k).map(|v| !v.trim().is_empty()).unwrap_or(false));
    let bonus = if validation.fraud_score < 40 && camera_present {
        (40 - validation.fraud_score) as f64 / 100.0
    } else {
        0.0
    };

    debug!(
        heuristic,
        frequency,
        metadata_risk,
        face_swap,
        faces_detected,
        combined,
        bonus,
        "weighted composite"
    );

    // Definitive AI band.
    if combined > 0.85 {
        return Verdict {
            status: VerdictStatus::AiGenerated,
            confidence: combined.min(0.98),
            reason: format!("Strong AI generation indicators (score: {combined:.2})"),
        };
    }

    // Probable AI band, with an escape hatch for professional editing
    // whose visual evidence is weak.
    if combined > 0.70 {
        let visual = 0.3 * heuristic + 0.4 * frequency;
        if trusted_software && visual < 0.50 {
            return Verdict {
                status: VerdictStatus::Real,
                confidence: 0.70,
                reason: "Professional photo editing detected, but visual analysis shows natural patterns"
                    .into(),
            };
        }
        return Verdict {
            status: VerdictStatus::AiGenerated,
            confidence: combined,
            reason: format!("AI generation likely (combined indicators: {combined:.2})"),
        };
    }

    // Suspicious band.
    if combined > 0.50 {
        if stock_photo {
            return Verdict {
                status: VerdictStatus::Real,
                confidence: 0.70,
                reason: "Professional stock photo - EXIF stripped by provider".into(),
            };
        }
        if trusted_software {
            let visual = 0.3 * heuristic + 0.4 * frequency;
            if visual < 0.60 {
                return Verdict {
                    status: VerdictStatus::Real,
                    confidence: 0.75,
                    reason: "Professional photo editing - visual analysis shows natural patterns"
                        .into(),
                };
            }
        }
        if faces_detected > 0 && face_swap > 0.70 {
            return Verdict {
                status: VerdictStatus::Manipulated,
                confidence: face_swap,
                reason: "Face swap / deepfake indicators detected".into(),
            };
        }
        let messaging = validation.red_flags.iter().any(|f| {
            let reason = f.reason.to_lowercase();
            reason.contains("whatsapp") || reason.contains("telegram")
        });
        if messaging {
            return Verdict {
                status: VerdictStatus::Manipulated,
                confidence: 0.75,
                reason: "Messaging app processing - forensic data stripped".into(),
            };
        }
        return Verdict {
            status: VerdictStatus::Manipulated,
            confidence: combined,
            reason: format!("Suspicious indicators detected (score: {combined:.2})"),
        };
    }

    // Borderline band: good metadata can rescue it.
    if combined > 0.35 {
        if bonus > 0.0 && combined < 0.50 {
            return Verdict {
                status: VerdictStatus::Real,
                confidence: (1.0 - combined + bonus).max(0.70),
                reason: "Authentic camera photo with complete EXIF data (device verified)".into(),
            };
        }
        return Verdict {
            status: VerdictStatus::Inconclusive,
            confidence: 0.50,
            reason: format!("Mixed signals - manual review recommended (score: {combined:.2})"),
        };
    }

    // Likely real band.
    if combined > 0.20 {
        return Verdict {
            status: VerdictStatus::Real,
            confidence: (1.0 - combined + bonus).min(0.90),
            reason: format!("Natural photo characteristics detected (score: {combined:.2})"),
        };
    }

    // Definitive real band.
    Verdict {
        status: VerdictStatus::Real,
        confidence: (1.0 - combined + bonus).clamp(0.85, 0.95),
        reason: "Strong indicators of authentic photograph".into(),
    }
}

fn score_of(reports: &BTreeMap<DetectorId, DetectorReport>, id: DetectorId) -> f64 {
    reports.get(&id).map(|r| r.score).unwrap_or(0.5)
}

fn visual_watermark_hit(
    reports: &BTreeMap<DetectorId, DetectorReport>,
) -> Option<&crate::report::VisualWatermarkHit> {
    let report = reports.get(&DetectorId::VisualWatermark)?;
    if report.is_terminal() {
        return None;
    }
    match &report.data {
        DetectorData::VisualWatermark { hit } => hit.as_ref(),
        _ => None,
    }
}

fn crypto_probe(reports: &BTreeMap<DetectorId, DetectorReport>) -> Option<(bool, f64, String)> {
    let report = reports.get(&DetectorId::CryptoWatermark)?;
    if report.is_terminal() {
        return None;
    }
    match &report.data {
        DetectorData::CryptoWatermark { probe } => {
            Some((probe.detected, probe.confidence, probe.kind.clone()))
        }
        _ => None,
    }
}

/// Validator findings, or the neutral stand-in when the slot is terminal
/// (neutral slots carry no flags, so they cannot fire overrides).
fn validator_report(reports: &BTreeMap<DetectorId, DetectorReport>) -> ValidatorReport {
    match reports.get(&DetectorId::Metadata) {
        Some(report) if !report.is_terminal() => match &report.data {
            DetectorData::Metadata(validation) => validation.clone(),
            _ => ValidatorReport::neutral(),
        },
        _ => ValidatorReport::neutral(),
    }
}

fn face_swap_outcome(reports: &BTreeMap<DetectorId, DetectorReport>) -> (f64, usize) {
    match reports.get(&DetectorId::FaceSwap) {
        Some(report) if !report.is_terminal() => match &report.data {
            DetectorData::FaceSwap { faces_detected, .. } => (report.score, *faces_detected),
            _ => (0.0, 0),
        },
        _ => (0.0, 0),
    }
}

fn metadata_checks_mention_stock(reports: &BTreeMap<DetectorId, DetectorReport>) -> bool {
    const STOCK_MARKERS: [&str; 6] = [
        "stock photo",
        "freepik",
        "shutterstock",
        "getty",
        "pexels",
        "unsplash",
    ];
    reports
        .get(&DetectorId::Metadata)
        .filter(|r| !r.is_terminal())
        .map(|r| {
            r.checks.iter().any(|check| {
                let reason = check.reason.to_lowercase();
                STOCK_MARKERS.iter().any(|m| reason.contains(m))
            })
        })
        .unwrap_or(false)
}

/// Reason string for the fraud-score override: the numeric score plus the
/// most damning one or two flags (by severity, then layer order).
fn fraud_reason(fraud_score: u32, red_flags: &[RedFlag]) -> String {
    let mut parts = vec![format!("EXIF fraud score: {fraud_score}/100")];

    let mut ranked: Vec<&RedFlag> = red_flags
        .iter()
        .filter(|f| f.severity != Severity::Bonus)
        .collect();
    ranked.sort_by_key(|f| f.severity.rank());
    let top: Vec<String> = ranked.iter().take(2).map(|f| f.reason.clone()).collect();
    if !top.is_empty() {
        parts.push(top.join(", "));
    }

    parts.join(". ")
}
