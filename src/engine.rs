//! Verification engine
//!
//! One entry point: decode once, parse metadata once, fan the detector
//! set out under the request deadline, fuse, and assemble the wire
//! result. Everything the request touches is owned by the request scope;
//! the only shared state is the read-only configuration.

use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::detect::{self, AnalysisContext, CancelToken};
use crate::error::{Error, Result};
use crate::exif;
use crate::executor;
use crate::fusion;
use crate::jpeg;
use crate::loader::{DecodedImage, ImageFormat};
use crate::report::{DetectorData, DetectorId, DetectorReport};
use crate::request::{Detail, Mode, VerifyOptions};
use crate::response::{
    FaceSwapBlock, FftBlock, MetadataBlock, ValidationBlock, VerifyResult, VisualWatermarkBlock,
    WatermarkAnalysisBlock,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, info_span, Instrument};

/// The forensic verification pipeline.
#[derive(Debug)]
pub struct Engine {
    config: Arc<Config>,
    collaborators: Collaborators,
    options: VerifyOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            config: Config::shared(),
            collaborators: Collaborators::default(),
            options: VerifyOptions::default(),
        }
    }

    /// Replace the collaborator set (real OCR / face / credential
    /// engines).
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Engine {
        self.collaborators = collaborators;
        self
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Engine {
        self.options = options;
        self
    }

    /// Verify one image.
    ///
    /// Fatal errors are undecodable input and the request deadline;
    /// everything else degrades to neutral detector slots and still
    /// produces a verdict.
    pub async fn verify(&self, bytes: &[u8], mode: Mode, detail: Detail) -> Result<VerifyResult> {
        let started = Instant::now();
        let content_hash = hex_digest(bytes);
        let span = info_span!("verify", hash = %&content_hash[..12], ?mode);

        async {
            let ctx = self.build_context(bytes, mode).await?;
            info!(
                format = ctx.image.format.name(),
                width = ctx.image.width,
                height = ctx.image.height,
                exif_fields = ctx.exif.len(),
                "context ready"
            );

            let cancel = ctx.cancel.clone();
            let detector_deadline = self
                .options
                .detector_deadline
                .min(self.options.request_deadline);
            let run = executor::run_detectors(ctx.clone(), detect::standard_set(), detector_deadline);
            let reports = match timeout(self.options.request_deadline, run).await {
                Ok(reports) => reports,
                Err(_) => {
                    cancel.cancel();
                    return Err(Error::DeadlineExceeded(
                        self.options.request_deadline.as_millis() as u64,
                    ));
                }
            };

            let verdict = fusion::decide(&reports, &ctx.exif);
            info!(
                status = ?verdict.status,
                confidence = verdict.confidence,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "verdict determined"
            );

            Ok(assemble_result(
                &ctx,
                reports,
                verdict,
                detail,
                content_hash,
                started.elapsed().as_millis() as u64,
            ))
        }
        .instrument(span)
        .await
    }

    async fn build_context(&self, bytes: &[u8], mode: Mode) -> Result<Arc<AnalysisContext>> {
        let mut image = DecodedImage::decode(bytes)?;

        let mut exif_payload = None;
        let mut qtables = Vec::new();
        let mut icc_profile = None;
        match image.format {
            ImageFormat::Jpeg => {
                if let Ok(scanned) = jpeg::scan(bytes) {
                    if scanned.has_mpf {
                        image.mark_mpo();
                    }
                    exif_payload = scanned.exif;
                    qtables = scanned.quant_tables;
                    icc_profile = scanned.icc_profile;
                }
            }
            ImageFormat::Heic => {
                exif_payload = crate::heif::extract_exif(bytes);
            }
            // PNG/WebP metadata arrives only through the XMP scan and the
            // extended reader.
            _ => {}
        }

        let metadata = exif::read_metadata(exif_payload.as_deref(), bytes);
        let exif::Metadata {
            mut map,
            gps,
            xmp_packet,
        } = metadata;
        debug!(built_in = map.len(), "built-in metadata parsed");

        // The extended reader may perform I/O; the detector deadline
        // bounds it, and any failure just leaves the built-in map.
        match timeout(
            self.options.detector_deadline,
            self.collaborators.extended_exif.read_all(bytes),
        )
        .await
        {
            Ok(Ok(extended)) => exif::merge_extended(&mut map, extended),
            Ok(Err(e)) => debug!("extended metadata reader unavailable: {e}"),
            Err(_) => debug!("extended metadata reader timed out"),
        }

        Ok(Arc::new(AnalysisContext {
            bytes: bytes.to_vec(),
            image,
            exif: map,
            gps,
            xmp_packet,
            qtables,
            icc_profile,
            mode,
            source_platform: self.options.source_platform.clone(),
            config: self.config.clone(),
            collaborators: self.collaborators.clone(),
            cancel: CancelToken::new(),
        }))
    }
}

fn assemble_result(
    ctx: &AnalysisContext,
    reports: BTreeMap<DetectorId, DetectorReport>,
    verdict: crate::report::Verdict,
    detail: Detail,
    content_hash: String,
    processing_time_ms: u64,
) -> VerifyResult {
    let watermark_analysis = reports.get(&DetectorId::CryptoWatermark).and_then(|r| {
        if r.is_terminal() {
            return None;
        }
        match &r.data {
            DetectorData::CryptoWatermark { probe } if probe.detected => {
                Some(WatermarkAnalysisBlock {
                    kind: probe.kind.clone(),
                    confidence: probe.confidence,
                    metadata: probe.metadata.clone(),
                })
            }
            _ => None,
        }
    });

    let visual_watermark = reports.get(&DetectorId::VisualWatermark).and_then(|r| {
        if r.is_terminal() {
            return None;
        }
        match &r.data {
            DetectorData::VisualWatermark { hit: Some(hit) } => Some(VisualWatermarkBlock {
                detected: true,
                kind: hit.watermark_type.clone(),
                provider: hit.provider.clone(),
                text_found: hit.text_found.clone(),
                confidence: hit.confidence,
            }),
            _ => None,
        }
    });

    let mut result = VerifyResult {
        verdict: verdict.status,
        confidence: round4(verdict.confidence),
        reason: verdict.reason,
        watermark_detected: watermark_analysis.is_some(),
        processing_time_ms,
        watermark_analysis,
        visual_watermark,
        findings: None,
        metadata: None,
        ai_signatures: None,
        metadata_validation: None,
        fft_analysis: None,
        face_swap_analysis: None,
        intrinsic_analysis: None,
        detector_errors: None,
    };

    if detail == Detail::Basic {
        return result;
    }

    if let Some(report) = reports.get(&DetectorId::Heuristic) {
        result.findings = Some(report.checks.clone());
        if let DetectorData::Heuristic { ai_signatures } = &report.data {
            result.ai_signatures = Some(ai_signatures.clone());
        }
    }

    result.metadata = Some(MetadataBlock {
        exif: ctx.exif.clone(),
        gps: ctx.gps,
        format: ctx.image.format.name().to_string(),
        width: ctx.image.width,
        height: ctx.image.height,
        sha256: content_hash,
    });

    if let Some(report) = reports.get(&DetectorId::Metadata) {
        if let DetectorData::Metadata(validation) = &report.data {
            result.metadata_validation = Some(ValidationBlock {
                score: validation.fraud_score,
                risk_level: validation.risk_level,
                red_flags: validation.red_flags.clone(),
                checks: report.checks.clone(),
                verdict: validation.summary.clone(),
            });
        }
    }

    if let Some(report) = reports.get(&DetectorId::Frequency) {
        if let DetectorData::Frequency { spectral_anomalies } = &report.data {
            result.fft_analysis = Some(FftBlock {
                score: report.score,
                checks: report.checks.clone(),
                spectral_anomalies: spectral_anomalies.clone(),
            });
        }
    }

    if let Some(report) = reports.get(&DetectorId::FaceSwap) {
        if let DetectorData::FaceSwap {
            faces_detected,
            artifacts,
        } = &report.data
        {
            result.face_swap_analysis = Some(FaceSwapBlock {
                score: report.score,
                faces_detected: *faces_detected,
                checks: report.checks.clone(),
                artifacts: artifacts.clone(),
            });
        }
    }

    if let Some(report) = reports.get(&DetectorId::Intrinsic) {
        if let DetectorData::Intrinsic { summary } = &report.data {
            result.intrinsic_analysis = Some(summary.clone());
        }
    }

    let errors: BTreeMap<String, String> = reports
        .iter()
        .filter_map(|(id, r)| r.error.clone().map(|e| (id.name().to_string(), e)))
        .collect();
    if !errors.is_empty() {
        result.detector_errors = Some(errors);
    }

    result
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_four_decimals() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.98), 0.98);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = hex_digest(b"");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
