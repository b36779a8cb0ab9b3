//! Detector set
//!
//! Each detector is a stateless rule over the shared, immutable analysis
//! context: it reads the decoded image and parsed metadata and returns a
//! [`DetectorReport`]. Detectors never abort the request; anything that
//! goes wrong inside one becomes a terminal (neutral) slot in the fan-out.

pub mod face_swap;
pub mod frequency;
pub mod heuristic;
pub mod intrinsic;
pub mod metadata;
pub mod visual_watermark;
pub mod watermark;

use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::error::Result;
use crate::exif::{ExifMap, GpsPosition};
use crate::jpeg::QuantTable;
use crate::loader::DecodedImage;
use crate::report::{DetectorId, DetectorReport};
use crate::request::Mode;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared by a request's detectors.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a detector may read. Built once per request, immutable, and
/// shared across the concurrent detector tasks.
#[derive(Debug)]
pub struct AnalysisContext {
    pub bytes: Vec<u8>,
    pub image: DecodedImage,
    /// Merged tag map (built-in parser + extended reader + XMP properties).
    pub exif: ExifMap,
    pub gps: Option<GpsPosition>,
    /// Raw XMP envelope, scoped for the AI-marker scan.
    pub xmp_packet: Option<String>,
    /// DQT tables in file order; empty for non-JPEG input.
    pub qtables: Vec<QuantTable>,
    pub icc_profile: Option<Vec<u8>>,
    pub mode: Mode,
    pub source_platform: Option<String>,
    pub config: Arc<Config>,
    pub collaborators: Collaborators,
    pub cancel: CancelToken,
}

impl AnalysisContext {
    /// Lowercased tag value, empty string when absent.
    pub fn tag_lower(&self, name: &str) -> String {
        self.exif
            .get(name)
            .map(|v| v.to_lowercase())
            .unwrap_or_default()
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.exif.get(name).map(String::as_str)
    }

    /// Camera model as claimed by EXIF, for fingerprint lookups.
    pub fn claimed_camera(&self) -> Option<&str> {
        self.tag("Model").filter(|m| !m.trim().is_empty())
    }

    /// True when EXIF absence is expected (stripped-by-channel photo mode).
    pub fn exif_absence_expected(&self) -> bool {
        self.mode == Mode::Photo && self.exif.is_empty()
    }
}

/// A member of the fan-out set.
#[async_trait]
pub trait Detector: Send + Sync {
    fn id(&self) -> DetectorId;

    /// Run the detector over the shared context.
    ///
    /// Errors and panics are contained by the executor; implementations
    /// should still prefer returning soft reports over errors wherever the
    /// evidence is merely absent.
    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport>;
}

/// Fixture builder shared by the detector unit tests.
#[cfg(test)]
pub(crate) mod testctx {
    use super::*;
    use crate::loader::ImageFormat;
    use image::RgbImage;

    pub struct ContextBuilder {
        exif: Vec<(String, String)>,
        mode: Mode,
        format: ImageFormat,
        dims: (u32, u32),
        byte_len: usize,
        xmp_packet: Option<String>,
        icc_profile: Option<Vec<u8>>,
        qtables: Vec<QuantTable>,
        source_platform: Option<String>,
        pixel_fill: Option<image::Rgb<u8>>,
        collaborators: Collaborators,
    }

    pub fn context() -> ContextBuilder {
        ContextBuilder {
            exif: Vec::new(),
            mode: Mode::Document,
            format: ImageFormat::Jpeg,
            dims: (64, 64),
            byte_len: 10_000,
            xmp_packet: None,
            icc_profile: None,
            qtables: Vec::new(),
            source_platform: None,
            pixel_fill: None,
            collaborators: Collaborators::default(),
        }
    }

    impl ContextBuilder {
        pub fn tag(mut self, key: &str, value: &str) -> Self {
            self.exif.push((key.into(), value.into()));
            self
        }

        pub fn mode(mut self, mode: Mode) -> Self {
            self.mode = mode;
            self
        }

        pub fn format(mut self, format: ImageFormat) -> Self {
            self.format = format;
            self
        }

        pub fn dims(mut self, width: u32, height: u32) -> Self {
            self.dims = (width, height);
            self
        }

        pub fn byte_len(mut self, len: usize) -> Self {
            self.byte_len = len;
            self
        }

        pub fn xmp(mut self, packet: &str) -> Self {
            self.xmp_packet = Some(packet.into());
            self
        }

        pub fn icc(mut self, profile: Vec<u8>) -> Self {
            self.icc_profile = Some(profile);
            self
        }

        pub fn qtable(mut self, values: [[u16; 8]; 8]) -> Self {
            self.qtables.push(QuantTable {
                table_id: self.qtables.len() as u8,
                values,
            });
            self
        }

        pub fn source_platform(mut self, platform: &str) -> Self {
            self.source_platform = Some(platform.into());
            self
        }

        pub fn fill(mut self, rgb: [u8; 3]) -> Self {
            self.pixel_fill = Some(image::Rgb(rgb));
            self
        }

        pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
            self.collaborators = collaborators;
            self
        }

        pub fn build(self) -> Arc<AnalysisContext> {
            let (w, h) = self.dims;
            let fill = self.pixel_fill.unwrap_or(image::Rgb([120, 110, 100]));
            let image =
                DecodedImage::from_rgb(self.format, RgbImage::from_pixel(w, h, fill));
            let mut exif = ExifMap::new();
            for (k, v) in self.exif {
                exif.insert(k, v);
            }
            Arc::new(AnalysisContext {
                bytes: vec![0u8; self.byte_len],
                image,
                exif,
                gps: None,
                xmp_packet: self.xmp_packet,
                qtables: self.qtables,
                icc_profile: self.icc_profile,
                mode: self.mode,
                source_platform: self.source_platform,
                config: Config::shared(),
                collaborators: self.collaborators,
                cancel: CancelToken::new(),
            })
        }
    }
}

/// The full detector set in identity order.
pub fn standard_set() -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(heuristic::HeuristicAnalyzer),
        Arc::new(metadata::MetadataValidator),
        Arc::new(visual_watermark::VisualWatermarkDetector),
        Arc::new(watermark::CryptoWatermarkDetector),
        Arc::new(frequency::FrequencyAnalyzer),
        Arc::new(face_swap::FaceSwapAnalyzer),
        Arc::new(intrinsic::IntrinsicAnalyzer),
    ]
}
