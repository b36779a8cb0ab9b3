//! Request-level options for a verification

use serde::Serialize;
use std::time::Duration;

/// How the image reached the pipeline.
///
/// `Photo` inputs arrived through channels that strip EXIF, so the
/// metadata validator relaxes its EXIF-absence penalties. `Document`
/// inputs preserve EXIF and get the full validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Photo,
    Document,
}

/// Response verbosity. `Basic` omits per-detector checks and details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Detail {
    Basic,
    Detailed,
}

/// Tunable limits for one verification request.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Whole-request deadline.
    pub request_deadline: Duration,
    /// Per-detector deadline.
    pub detector_deadline: Duration,
    /// Social platform the image was sourced from, when known. Suppresses
    /// the messaging-app fingerprint for platforms that strip EXIF
    /// themselves.
    pub source_platform: Option<String>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            request_deadline: Duration::from_secs(60),
            detector_deadline: Duration::from_secs(30),
            source_platform: None,
        }
    }
}
