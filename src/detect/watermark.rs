//! Cryptographic watermark detector
//!
//! Thin adapter over the [`CredentialProbe`] collaborator. The probe
//! contract does the real work (C2PA structural scan by default, vendor
//! services when plugged in); this detector normalizes its outcome into
//! the uniform report shape and never fails on absence.
//!
//! [`CredentialProbe`]: crate::collaborators::CredentialProbe

use super::{AnalysisContext, Detector};
use crate::error::Result;
use crate::report::{Check, CheckStatus, DetectorData, DetectorId, DetectorReport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct CryptoWatermarkDetector;

#[async_trait]
impl Detector for CryptoWatermarkDetector {
    fn id(&self) -> DetectorId {
        DetectorId::CryptoWatermark
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        let probe = ctx.collaborators.credentials.probe(&ctx.bytes).await;

        let mut report = DetectorReport::new(
            DetectorId::CryptoWatermark,
            if probe.detected { probe.confidence } else { 0.0 },
        );
        report.checks = vec![if probe.detected {
            info!(kind = %probe.kind, confidence = probe.confidence, "content credentials detected");
            Check::new(
                "Content Credentials",
                CheckStatus::Fail,
                probe.confidence,
                format!("Embedded {} credentials detected", probe.kind),
            )
        } else {
            Check::new(
                "Content Credentials",
                CheckStatus::Pass,
                0.0,
                "No embedded credentials found",
            )
        }];
        report.data = DetectorData::CryptoWatermark { probe };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Collaborators, CredentialProbe};
    use crate::detect::testctx::context;
    use crate::report::WatermarkProbe;

    struct AlwaysDetects;

    #[async_trait]
    impl CredentialProbe for AlwaysDetects {
        async fn probe(&self, _bytes: &[u8]) -> WatermarkProbe {
            WatermarkProbe {
                detected: true,
                kind: "synthid".into(),
                confidence: 0.99,
                metadata: Default::default(),
            }
        }
    }

    #[tokio::test]
    async fn surfaces_probe_detection() {
        let ctx = context()
            .collaborators(Collaborators {
                credentials: Arc::new(AlwaysDetects),
                ..Default::default()
            })
            .build();
        let report = CryptoWatermarkDetector.analyze(ctx).await.unwrap();
        match &report.data {
            DetectorData::CryptoWatermark { probe } => {
                assert!(probe.detected);
                assert_eq!(probe.kind, "synthid");
            }
            other => panic!("unexpected data: {other:?}"),
        }
        assert_eq!(report.score, 0.99);
    }

    #[tokio::test]
    async fn absence_is_a_clean_pass() {
        let ctx = context().build();
        let report = CryptoWatermarkDetector.analyze(ctx).await.unwrap();
        match &report.data {
            DetectorData::CryptoWatermark { probe } => assert!(!probe.detected),
            other => panic!("unexpected data: {other:?}"),
        }
        assert_eq!(report.score, 0.0);
        assert!(!report.is_terminal());
    }
}
