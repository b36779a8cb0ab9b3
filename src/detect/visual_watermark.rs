//! Visual watermark detector: OCR text search
//!
//! Generators and stock agencies stamp visible text; a sparse-text OCR
//! pass plus two keyword dictionaries catches the obvious cases. OCR
//! unavailability is a soft miss, never a terminal error.

use super::{AnalysisContext, Detector};
use crate::error::Result;
use crate::report::{
    Check, CheckStatus, DetectorData, DetectorId, DetectorReport, VisualWatermarkHit,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const AI_WATERMARK_CONFIDENCE: f64 = 0.90;
const STOCK_WATERMARK_CONFIDENCE: f64 = 0.85;

pub struct VisualWatermarkDetector;

#[async_trait]
impl Detector for VisualWatermarkDetector {
    fn id(&self) -> DetectorId {
        DetectorId::VisualWatermark
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || Ok(run(&ctx)))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

fn run(ctx: &AnalysisContext) -> DetectorReport {
    let pixels = match ctx.image.pixels() {
        Ok(p) => p,
        Err(_) => return soft_miss("no pixel data for OCR"),
    };

    let text = match ctx.collaborators.ocr.extract_sparse_text(pixels) {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            debug!("OCR unavailable: {e}");
            return soft_miss("ocr_unavailable");
        }
    };

    if let Some(hit) = match_watermark(ctx, &text) {
        info!(
            provider = %hit.provider,
            kind = %hit.watermark_type,
            text = %hit.text_found,
            "visual watermark detected"
        );
        let mut report = DetectorReport::new(DetectorId::VisualWatermark, hit.confidence);
        report.checks = vec![Check::new(
            "OCR Watermark Scan",
            CheckStatus::Fail,
            hit.confidence,
            format!("{} watermark: {}", hit.provider, hit.text_found),
        )];
        if !text.is_empty() {
            report
                .details
                .insert("extracted_text".into(), truncate(&text, 500));
        }
        report.data = DetectorData::VisualWatermark { hit: Some(hit) };
        return report;
    }

    let mut report = DetectorReport::new(DetectorId::VisualWatermark, 0.0);
    report.checks = vec![Check::new(
        "OCR Watermark Scan",
        CheckStatus::Pass,
        0.0,
        "No watermark text detected",
    )];
    if !text.is_empty() {
        report
            .details
            .insert("extracted_text".into(), truncate(&text, 500));
    }
    report.data = DetectorData::VisualWatermark { hit: None };
    report
}

fn match_watermark(ctx: &AnalysisContext, text: &str) -> Option<VisualWatermarkHit> {
    if text.is_empty() {
        return None;
    }
    let tables = &ctx.config.tables;

    for (provider, keywords) in &tables.ai_watermarks {
        for keyword in keywords {
            if text.contains(keyword.as_str()) {
                return Some(VisualWatermarkHit {
                    watermark_type: "ai_generator".into(),
                    provider: provider.clone(),
                    confidence: AI_WATERMARK_CONFIDENCE,
                    text_found: keyword.clone(),
                    location: "bottom_right",
                    method: "ocr",
                });
            }
        }
    }

    for (provider, keywords) in &tables.stock_watermarks {
        for keyword in keywords {
            if text.contains(keyword.as_str()) {
                return Some(VisualWatermarkHit {
                    watermark_type: "stock_photo".into(),
                    provider: provider.clone(),
                    confidence: STOCK_WATERMARK_CONFIDENCE,
                    text_found: keyword.clone(),
                    location: "center",
                    method: "ocr",
                });
            }
        }
    }

    None
}

fn soft_miss(note: &str) -> DetectorReport {
    let mut report = DetectorReport::new(DetectorId::VisualWatermark, 0.0);
    report.checks = vec![Check::new(
        "OCR Watermark Scan",
        CheckStatus::NotApplicable,
        0.0,
        note,
    )];
    report.details.insert("note".into(), note.into());
    report.data = DetectorData::VisualWatermark { hit: None };
    report
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}
