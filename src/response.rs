//! Wire-facing verification result

use crate::exif::{ExifMap, GpsPosition};
use crate::report::{
    AiSignatures, Check, FaceArtifacts, IntrinsicSummary, RedFlag, RiskLevel, SpectralAnomalies,
    VerdictStatus,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of one verification request.
///
/// `Basic` responses carry the verdict block and any watermark evidence;
/// `Detailed` responses add per-detector findings.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub verdict: VerdictStatus,
    /// Rounded to 4 decimals.
    pub confidence: f64,
    pub reason: String,
    /// True iff the cryptographic watermark probe detected credentials.
    pub watermark_detected: bool,
    pub processing_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_analysis: Option<WatermarkAnalysisBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_watermark: Option<VisualWatermarkBlock>,

    // Detailed-only blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Check>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_signatures: Option<AiSignatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_validation: Option<ValidationBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fft_analysis: Option<FftBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_swap_analysis: Option<FaceSwapBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intrinsic_analysis: Option<IntrinsicSummary>,
    /// Per-detector error strings for terminal slots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatermarkAnalysisBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    pub metadata: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualWatermarkBlock {
    pub detected: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub text_found: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataBlock {
    pub exif: ExifMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsPosition>,
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// SHA-256 of the submitted bytes.
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationBlock {
    pub score: u32,
    pub risk_level: RiskLevel,
    pub red_flags: Vec<RedFlag>,
    pub checks: Vec<Check>,
    pub verdict: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FftBlock {
    pub score: f64,
    pub checks: Vec<Check>,
    pub spectral_anomalies: SpectralAnomalies,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaceSwapBlock {
    pub score: f64,
    pub faces_detected: usize,
    pub checks: Vec<Check>,
    pub artifacts: FaceArtifacts,
}
