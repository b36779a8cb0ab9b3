//! Seed scenarios and invariants for the fusion engine
//!
//! Each scenario builds the detector reports by hand and checks the
//! decided verdict, so the override cascade and the banded composite are
//! pinned independently of the pixel detectors.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use veriframe::exif::ExifMap;
use veriframe::fusion;
use veriframe::report::{
    DetectorData, DetectorId, DetectorReport, RedFlag, RiskLevel, Severity, TrustLevel,
    ValidatorReport, VerdictStatus, VisualWatermarkHit, WatermarkProbe,
};

fn validator(fraud_score: u32, red_flags: Vec<RedFlag>) -> DetectorData {
    DetectorData::Metadata(ValidatorReport {
        fraud_score,
        risk_level: RiskLevel::from_score(fraud_score),
        red_flags,
        summary: String::new(),
    })
}

fn flag(layer: &str, reason: &str, severity: Severity) -> RedFlag {
    RedFlag {
        layer: layer.into(),
        reason: reason.into(),
        severity,
        score: 0,
        trust_level: None,
        requires_visual_proof: None,
        description: None,
    }
}

/// All detectors present, nothing suspicious, MV fraud score configurable.
fn baseline() -> BTreeMap<DetectorId, DetectorReport> {
    let mut reports = BTreeMap::new();
    for id in DetectorId::ALL {
        let mut report = DetectorReport::new(id, 0.5);
        report.data = match id {
            DetectorId::Metadata => validator(50, Vec::new()),
            DetectorId::VisualWatermark => DetectorData::VisualWatermark { hit: None },
            DetectorId::CryptoWatermark => DetectorData::CryptoWatermark {
                probe: WatermarkProbe::absent(),
            },
            DetectorId::FaceSwap => DetectorData::FaceSwap {
                faces_detected: 0,
                artifacts: Default::default(),
            },
            _ => DetectorData::None,
        };
        if id == DetectorId::FaceSwap {
            report.score = 0.0;
        }
        reports.insert(id, report);
    }
    reports
}

fn set_scores(
    reports: &mut BTreeMap<DetectorId, DetectorReport>,
    heuristic: f64,
    frequency: f64,
    fraud_score: u32,
    red_flags: Vec<RedFlag>,
) {
    reports.get_mut(&DetectorId::Heuristic).unwrap().score = heuristic;
    reports.get_mut(&DetectorId::Frequency).unwrap().score = frequency;
    let metadata = reports.get_mut(&DetectorId::Metadata).unwrap();
    metadata.score = fraud_score as f64 / 100.0;
    metadata.data = validator(fraud_score, red_flags);
}

fn set_faces(reports: &mut BTreeMap<DetectorId, DetectorReport>, faces: usize, score: f64) {
    let face_swap = reports.get_mut(&DetectorId::FaceSwap).unwrap();
    face_swap.score = score;
    face_swap.data = DetectorData::FaceSwap {
        faces_detected: faces,
        artifacts: Default::default(),
    };
}

fn exif_with_camera() -> ExifMap {
    let mut map = ExifMap::new();
    map.insert("Make".into(), "Apple".into());
    map.insert("Model".into(), "iPhone 13".into());
    map
}

#[test]
fn s1_visual_watermark_overrides_everything() {
    let mut reports = baseline();
    // Every other signal says "real"; the watermark must still win.
    set_scores(&mut reports, 0.1, 0.1, 0, Vec::new());
    reports.get_mut(&DetectorId::VisualWatermark).unwrap().data =
        DetectorData::VisualWatermark {
            hit: Some(VisualWatermarkHit {
                watermark_type: "ai_generator".into(),
                provider: "midjourney".into(),
                confidence: 0.92,
                text_found: "Midjourney".into(),
                location: "bottom_right",
                method: "ocr",
            }),
        };

    let verdict = fusion::decide(&reports, &exif_with_camera());
    assert_eq!(verdict.status, VerdictStatus::AiGenerated);
    assert_eq!(verdict.confidence, 0.98);
    assert!(verdict.reason.contains("midjourney"));
}

#[test]
fn s1b_stock_watermark_reads_as_manipulated() {
    let mut reports = baseline();
    reports.get_mut(&DetectorId::VisualWatermark).unwrap().data =
        DetectorData::VisualWatermark {
            hit: Some(VisualWatermarkHit {
                watermark_type: "stock_photo".into(),
                provider: "shutterstock".into(),
                confidence: 0.85,
                text_found: "shutterstock".into(),
                location: "center",
                method: "ocr",
            }),
        };

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Manipulated);
    assert_eq!(verdict.confidence, 0.90);
}

#[test]
fn s2_critical_ai_red_flag_is_decisive() {
    let mut reports = baseline();
    let mut ai_flag = flag(
        "XMP AI Markers",
        "Google AI editing marker detected in XMP",
        Severity::Critical,
    );
    ai_flag.requires_visual_proof = Some(false);
    set_scores(&mut reports, 0.5, 0.5, 50, vec![ai_flag]);

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::AiGenerated);
    assert_eq!(verdict.confidence, 0.98);
    assert!(verdict.reason.contains("Google AI"));
}

#[test]
fn s2b_critical_screenshot_flag_is_manipulated() {
    let mut reports = baseline();
    let screenshot = flag(
        "Screenshot Detection",
        "Screenshot software detected: snipping tool",
        Severity::Critical,
    );
    set_scores(&mut reports, 0.5, 0.5, 50, vec![screenshot]);

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Manipulated);
    assert_eq!(verdict.confidence, 0.95);
}

#[test]
fn s3_high_fraud_score_override() {
    let mut reports = baseline();
    set_scores(
        &mut reports,
        0.5,
        0.5,
        92,
        vec![flag("GPS Validation", "GPS data missing", Severity::High)],
    );

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::AiGenerated);
    assert_eq!(verdict.confidence, 0.92);
    assert!(verdict.reason.contains("92/100"));

    // Between 80 and 89 the same override reads as manipulation.
    set_scores(&mut reports, 0.5, 0.5, 85, Vec::new());
    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Manipulated);
    assert_eq!(verdict.confidence, 0.85);
}

#[test]
fn s4_good_metadata_bonus_lifts_clean_photo() {
    let mut reports = baseline();
    set_scores(&mut reports, 0.2, 0.2, 20, Vec::new());
    set_faces(&mut reports, 0, 0.0);

    let verdict = fusion::decide(&reports, &exif_with_camera());
    assert_eq!(verdict.status, VerdictStatus::Real);
    // combined = 0.35*0.2 + 0.30*0.2 + 0.25*0.2 = 0.18 (< 0.20 band),
    // bonus = 0.20, so the confidence caps at 0.95.
    assert!(verdict.confidence >= 0.85);
}

#[test]
fn s5_trusted_software_relief_keeps_photo_real() {
    let mut reports = baseline();
    let mut lightroom = flag(
        "Software Manipulation",
        "Professional photo software: lightroom (from Software)",
        Severity::Low,
    );
    lightroom.trust_level = Some(TrustLevel::High);
    lightroom.requires_visual_proof = Some(true);
    set_scores(&mut reports, 0.4, 0.5, 45, vec![lightroom]);
    set_faces(&mut reports, 0, 0.0);

    let verdict = fusion::decide(&reports, &exif_with_camera());
    // Relief drops the metadata risk from 0.45 to 0.15:
    // combined = 0.35*0.4 + 0.30*0.5 + 0.25*0.15 = 0.3275.
    assert_eq!(verdict.status, VerdictStatus::Real);
    assert!(verdict.confidence >= 0.65);

    // Without relief the same inputs stay ambiguous.
    set_scores(&mut reports, 0.4, 0.5, 45, Vec::new());
    let verdict = fusion::decide(&reports, &exif_with_camera());
    assert_eq!(verdict.status, VerdictStatus::Inconclusive);
}

#[test]
fn s6_dominant_face_swap_reads_as_manipulated() {
    let mut reports = baseline();
    set_scores(&mut reports, 0.6, 0.7, 55, Vec::new());
    set_faces(&mut reports, 1, 0.82);

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Manipulated);
    assert_eq!(verdict.confidence, 0.82);
    assert!(verdict.reason.contains("Face swap"));
}

#[test]
fn s7_all_terminal_is_inconclusive() {
    let mut reports = BTreeMap::new();
    for id in DetectorId::ALL {
        reports.insert(id, DetectorReport::terminal(id, "synthetic failure"));
    }
    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Inconclusive);
    assert_eq!(verdict.confidence, 0.5);
    assert_eq!(verdict.reason, "analysis_failed");
}

#[test]
fn messaging_flag_drives_suspicious_band_to_manipulated() {
    let mut reports = baseline();
    let messaging = flag(
        "Messaging App Detection",
        "WhatsApp/Telegram detected (confidence: 0.80)",
        Severity::Critical,
    );
    set_scores(&mut reports, 0.6, 0.7, 55, vec![messaging]);

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Manipulated);
    assert_eq!(verdict.confidence, 0.75);
    assert!(verdict.reason.contains("Messaging app"));
}

#[test]
fn stock_photo_check_rescues_suspicious_band() {
    let mut reports = baseline();
    set_scores(&mut reports, 0.6, 0.7, 55, Vec::new());
    let metadata = reports.get_mut(&DetectorId::Metadata).unwrap();
    metadata.checks.push(veriframe::report::Check::new(
        "Screenshot Detection",
        veriframe::report::CheckStatus::Pass,
        0.0,
        "Stock photo from freepik (EXIF stripped by provider)",
    ));

    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Real);
    assert_eq!(verdict.confidence, 0.70);
}

#[test]
fn boundary_values_belong_to_the_upper_closed_band() {
    // combined exactly 0.50: 0.35*1.0 + 0.30*0.5 + 0.25*0.0 = 0.50, which
    // must land in the 0.35-0.50 band (inconclusive without a bonus), not
    // the suspicious band.
    let mut reports = baseline();
    set_scores(&mut reports, 1.0, 0.5, 0, Vec::new());
    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Inconclusive);
    assert_eq!(verdict.confidence, 0.50);

    // combined exactly 0.20: 0.35*0.4 + 0.30*0.2 + 0.25*0.0 = 0.20, which
    // must land in the definitive-real band.
    set_scores(&mut reports, 0.4, 0.2, 0, Vec::new());
    let verdict = fusion::decide(&reports, &ExifMap::new());
    assert_eq!(verdict.status, VerdictStatus::Real);
    assert_eq!(verdict.confidence, 0.85);
}

#[test]
fn single_terminal_detector_never_breaks_the_verdict() {
    for failed in DetectorId::ALL {
        let mut reports = baseline();
        set_scores(&mut reports, 0.3, 0.3, 25, Vec::new());
        reports.insert(failed, DetectorReport::terminal(failed, "synthetic failure"));

        let verdict = fusion::decide(&reports, &exif_with_camera());
        assert!(
            matches!(
                verdict.status,
                VerdictStatus::Real
                    | VerdictStatus::AiGenerated
                    | VerdictStatus::Manipulated
                    | VerdictStatus::Inconclusive
            ),
            "verdict must exist with {failed:?} terminal"
        );
        assert!((0.0..=0.98).contains(&verdict.confidence));
    }
}

#[test]
fn confidence_is_always_within_bounds() {
    let grid = [0.0, 0.15, 0.35, 0.5, 0.65, 0.85, 1.0];
    for &heuristic in &grid {
        for &frequency in &grid {
            for &fraud in &[0u32, 20, 45, 70, 95] {
                let mut reports = baseline();
                set_scores(&mut reports, heuristic, frequency, fraud, Vec::new());
                let verdict = fusion::decide(&reports, &exif_with_camera());
                assert!(
                    (0.0..=1.0).contains(&verdict.confidence),
                    "confidence out of range for ha={heuristic} fd={frequency} mv={fraud}"
                );
            }
        }
    }
}
