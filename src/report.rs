//! Detector report model
//!
//! Every detector produces the same uniform record: a suspicion score in
//! [0, 1], an ordered list of named checks, detector-specific details, and
//! an optional terminal error. The metadata validator extends the record
//! with its integer fraud score and red flags. Failures never propagate as
//! panics or early returns; they become data the fusion engine can reason
//! about.

use indexmap::IndexMap;
use serde::Serialize;

/// Neutral score reported by a detector that failed or timed out.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Identity of a detector in the fan-out set.
///
/// The derived ordering fixes the order in which results are collected and
/// reported, independent of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorId {
    Heuristic,
    Metadata,
    VisualWatermark,
    CryptoWatermark,
    Frequency,
    FaceSwap,
    Intrinsic,
}

impl DetectorId {
    pub const ALL: [DetectorId; 7] = [
        DetectorId::Heuristic,
        DetectorId::Metadata,
        DetectorId::VisualWatermark,
        DetectorId::CryptoWatermark,
        DetectorId::Frequency,
        DetectorId::FaceSwap,
        DetectorId::Intrinsic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectorId::Heuristic => "heuristic",
            DetectorId::Metadata => "metadata",
            DetectorId::VisualWatermark => "visual_watermark",
            DetectorId::CryptoWatermark => "crypto_watermark",
            DetectorId::Frequency => "frequency",
            DetectorId::FaceSwap => "face_swap",
            DetectorId::Intrinsic => "intrinsic",
        }
    }
}

/// Outcome of a single named check inside a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// One check record inside a detector report.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub layer: String,
    pub status: CheckStatus,
    pub score: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Check {
    pub fn new(layer: impl Into<String>, status: CheckStatus, score: f64, reason: impl Into<String>) -> Self {
        Check {
            layer: layer.into(),
            status,
            score,
            reason: reason.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Severity grading for metadata red flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Bonus,
}

impl Severity {
    /// Rank for reason construction: most damning first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Bonus => 4,
        }
    }
}

/// Trust grading for recognized professional photo software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    High,
    Medium,
}

/// A scored finding from one validation layer.
#[derive(Debug, Clone, Serialize)]
pub struct RedFlag {
    pub layer: String,
    pub reason: String,
    pub severity: Severity,
    /// Signed layer contribution; negative values are authenticity bonuses.
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_visual_proof: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Risk banding of the metadata fraud score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "MINIMAL")]
    Minimal,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => RiskLevel::Critical,
            60..=79 => RiskLevel::High,
            40..=59 => RiskLevel::Medium,
            20..=39 => RiskLevel::Low,
            _ => RiskLevel::Minimal,
        }
    }
}

/// Metadata validator output: the uniform fields plus fraud scoring.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatorReport {
    /// 0-100, higher = more suspicious.
    pub fraud_score: u32,
    pub risk_level: RiskLevel,
    pub red_flags: Vec<RedFlag>,
    /// Human-readable summary band.
    pub summary: String,
}

impl ValidatorReport {
    pub fn neutral() -> Self {
        ValidatorReport {
            fraud_score: 50,
            risk_level: RiskLevel::from_score(50),
            red_flags: Vec::new(),
            summary: String::new(),
        }
    }
}

/// AI generator signature booleans surfaced in detailed responses.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AiSignatures {
    pub midjourney: bool,
    pub dalle: bool,
    pub stable_diffusion: bool,
    pub unknown_ai: bool,
}

/// Visual (OCR) watermark hit.
#[derive(Debug, Clone, Serialize)]
pub struct VisualWatermarkHit {
    /// "ai_generator" or "stock_photo".
    pub watermark_type: String,
    pub provider: String,
    pub confidence: f64,
    pub text_found: String,
    pub location: &'static str,
    pub method: &'static str,
}

/// Cryptographic / content-credentials probe result.
#[derive(Debug, Clone, Serialize)]
pub struct WatermarkProbe {
    pub detected: bool,
    /// "c2pa", "synthid", "meta", "none".
    pub kind: String,
    pub confidence: f64,
    pub metadata: IndexMap<String, String>,
}

impl WatermarkProbe {
    pub fn absent() -> Self {
        WatermarkProbe {
            detected: false,
            kind: "none".into(),
            confidence: 0.0,
            metadata: IndexMap::new(),
        }
    }
}

/// Spectral anomaly booleans from the frequency-domain analyzer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpectralAnomalies {
    pub jpeg_artifacts_missing: bool,
    pub high_freq_anomaly: bool,
    pub power_spectrum_anomaly: bool,
    pub periodic_patterns: bool,
}

/// Artifact booleans from the face-swap analyzer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FaceArtifacts {
    pub boundary_artifacts: bool,
    pub color_mismatch: bool,
    pub lighting_inconsistent: bool,
    pub compression_mismatch: bool,
}

/// Aggregated intrinsic pixel analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntrinsicSummary {
    pub is_ai_intrinsic: bool,
    pub total_score: u32,
    pub detection_methods: Vec<String>,
}

/// Detector-specific findings carried alongside the uniform fields.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DetectorData {
    Heuristic { ai_signatures: AiSignatures },
    Metadata(ValidatorReport),
    VisualWatermark { hit: Option<VisualWatermarkHit> },
    CryptoWatermark { probe: WatermarkProbe },
    Frequency { spectral_anomalies: SpectralAnomalies },
    FaceSwap { faces_detected: usize, artifacts: FaceArtifacts },
    Intrinsic { summary: IntrinsicSummary },
    None,
}

/// Uniform record produced by every detector.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorReport {
    pub id: DetectorId,
    /// Suspicion score in [0, 1]; 0.5 is neutral.
    pub score: f64,
    pub checks: Vec<Check>,
    #[serde(skip_serializing_if = "detail_map_is_empty")]
    pub details: IndexMap<String, String>,
    pub data: DetectorData,
    /// Set when the detector failed or timed out; the slot is then neutral.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn detail_map_is_empty(map: &IndexMap<String, String>) -> bool {
    map.is_empty()
}

impl DetectorReport {
    pub fn new(id: DetectorId, score: f64) -> Self {
        DetectorReport {
            id,
            score,
            checks: Vec::new(),
            details: IndexMap::new(),
            data: DetectorData::None,
            error: None,
        }
    }

    /// Neutral slot for a detector that failed or timed out.
    ///
    /// Terminal reports always carry score 0.5 and no checks so they cannot
    /// trigger overrides or bias the composite.
    pub fn terminal(id: DetectorId, error: impl Into<String>) -> Self {
        DetectorReport {
            id,
            score: NEUTRAL_SCORE,
            checks: Vec::new(),
            details: IndexMap::new(),
            data: DetectorData::None,
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.error.is_some()
    }
}

/// Final verdict over an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Real,
    AiGenerated,
    Manipulated,
    Inconclusive,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub confidence: f64,
    pub reason: String,
}
