//! Detector executor: bounded parallel fan-out
//!
//! Runs the detector set concurrently over one shared context. Each
//! detector is bounded by its own deadline and isolated from the others:
//! an error, panic, or timeout turns its slot into a neutral terminal
//! report while the rest continue. Results are keyed by detector identity,
//! so downstream fusion sees a deterministic order regardless of
//! completion order. Parallelism is capped at the CPU count; a request's
//! detectors share the pool instead of multiplying it.

use crate::detect::{AnalysisContext, Detector};
use crate::report::{DetectorId, DetectorReport};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Run `detectors` over `ctx`, each bounded by `detector_deadline`.
///
/// Always returns one report per detector. The call itself completes
/// within max(deadlines) plus scheduling slack; the request-level
/// cancellation token is flipped by the caller when the overall deadline
/// expires, which in-flight pixel loops poll cooperatively.
pub async fn run_detectors(
    ctx: Arc<AnalysisContext>,
    detectors: Vec<Arc<dyn Detector>>,
    detector_deadline: Duration,
) -> BTreeMap<DetectorId, DetectorReport> {
    let pool = Arc::new(Semaphore::new(num_cpus::get().max(1)));
    let expected: Vec<DetectorId> = detectors.iter().map(|d| d.id()).collect();

    let mut tasks = JoinSet::new();
    for detector in detectors {
        let ctx = ctx.clone();
        let pool = pool.clone();
        tasks.spawn(async move {
            let id = detector.id();
            // Pool slots are held for the detector's whole run; queued
            // detectors start as slots free up.
            let _permit = pool.acquire_owned().await;
            let report = match timeout(detector_deadline, detector.analyze(ctx.clone())).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    warn!(detector = id.name(), error = %e, "detector failed");
                    DetectorReport::terminal(id, e.to_string())
                }
                Err(_) => {
                    warn!(
                        detector = id.name(),
                        deadline_ms = detector_deadline.as_millis() as u64,
                        "detector timed out"
                    );
                    DetectorReport::terminal(id, "deadline exceeded")
                }
            };
            (id, report)
        });
    }

    let mut reports = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, report)) => {
                debug!(
                    detector = id.name(),
                    score = report.score,
                    terminal = report.is_terminal(),
                    "detector completed"
                );
                reports.insert(id, report);
            }
            Err(e) => {
                // The panicking task's identity is gone; the backfill
                // below marks whichever slot is missing.
                warn!(error = %e, "detector task aborted");
            }
        }
    }

    for id in expected {
        reports
            .entry(id)
            .or_insert_with(|| DetectorReport::terminal(id, "detector task aborted"));
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testctx::context;
    use crate::error::{Error, Result};
    use async_trait::async_trait;

    struct Fixed(DetectorId, f64);

    #[async_trait]
    impl Detector for Fixed {
        fn id(&self) -> DetectorId {
            self.0
        }
        async fn analyze(&self, _ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
            Ok(DetectorReport::new(self.0, self.1))
        }
    }

    struct Failing(DetectorId);

    #[async_trait]
    impl Detector for Failing {
        fn id(&self) -> DetectorId {
            self.0
        }
        async fn analyze(&self, _ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
            Err(Error::DetectorFailed("synthetic failure".into()))
        }
    }

    struct Panicking(DetectorId);

    #[async_trait]
    impl Detector for Panicking {
        fn id(&self) -> DetectorId {
            self.0
        }
        async fn analyze(&self, _ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
            tokio::task::spawn_blocking(|| panic!("synthetic panic"))
                .await
                .map_err(|e| Error::DetectorFailed(e.to_string()))?;
            unreachable!()
        }
    }

    struct Hanging(DetectorId);

    #[async_trait]
    impl Detector for Hanging {
        fn id(&self) -> DetectorId {
            self.0
        }
        async fn analyze(&self, _ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let ctx = context().build();
        let reports = run_detectors(
            ctx,
            vec![
                Arc::new(Fixed(DetectorId::Heuristic, 0.2)),
                Arc::new(Failing(DetectorId::Frequency)),
                Arc::new(Fixed(DetectorId::FaceSwap, 0.7)),
            ],
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(reports.len(), 3);
        assert!(!reports[&DetectorId::Heuristic].is_terminal());
        assert!(reports[&DetectorId::Frequency].is_terminal());
        assert_eq!(reports[&DetectorId::Frequency].score, 0.5);
        assert_eq!(reports[&DetectorId::FaceSwap].score, 0.7);
    }

    #[tokio::test]
    async fn panics_are_contained_as_terminal_slots() {
        let ctx = context().build();
        let reports = run_detectors(
            ctx,
            vec![
                Arc::new(Panicking(DetectorId::Intrinsic)),
                Arc::new(Fixed(DetectorId::Metadata, 0.1)),
            ],
            Duration::from_secs(5),
        )
        .await;

        assert!(reports[&DetectorId::Intrinsic].is_terminal());
        assert!(!reports[&DetectorId::Metadata].is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detectors_time_out_to_neutral() {
        let ctx = context().build();
        let reports = run_detectors(
            ctx,
            vec![
                Arc::new(Hanging(DetectorId::CryptoWatermark)),
                Arc::new(Fixed(DetectorId::Heuristic, 0.3)),
            ],
            Duration::from_millis(100),
        )
        .await;

        let slot = &reports[&DetectorId::CryptoWatermark];
        assert!(slot.is_terminal());
        assert_eq!(slot.score, 0.5);
        assert_eq!(slot.error.as_deref(), Some("deadline exceeded"));
        assert!(!reports[&DetectorId::Heuristic].is_terminal());
    }

    #[tokio::test]
    async fn results_are_ordered_by_identity() {
        let ctx = context().build();
        let reports = run_detectors(
            ctx,
            vec![
                Arc::new(Fixed(DetectorId::Intrinsic, 0.1)),
                Arc::new(Fixed(DetectorId::Heuristic, 0.2)),
                Arc::new(Fixed(DetectorId::Frequency, 0.3)),
            ],
            Duration::from_secs(5),
        )
        .await;

        let order: Vec<DetectorId> = reports.keys().copied().collect();
        assert_eq!(
            order,
            vec![
                DetectorId::Heuristic,
                DetectorId::Frequency,
                DetectorId::Intrinsic
            ]
        );
    }
}
