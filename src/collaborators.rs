//! External collaborator interfaces
//!
//! The pipeline's I/O-capable helpers (OCR, face detection, extended EXIF
//! reading, cryptographic watermark probing) live behind narrow traits so a
//! deployment can plug in real engines. The bundled defaults are
//! self-contained: OCR is reported unavailable (a soft miss, never an
//! error), face detection falls back to a coarse central box, the extended
//! reader yields nothing, and the credential probe is a structural C2PA
//! scan over the container itself.

use crate::error::{Error, Result};
use crate::exif::ExifMap;
use crate::jpeg;
use crate::report::WatermarkProbe;
use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// Axis-aligned face bounding box on the analyzed view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f64,
    /// True when this is the coarse central fallback, not a detection.
    pub coarse_fallback: bool,
}

/// OCR engine used by the visual watermark detector.
pub trait OcrEngine: Send + Sync {
    /// Extract sparse text from the image. Implementations should already
    /// filter out low-confidence fragments (the reference engine runs in
    /// sparse-text mode with a confidence floor of 30).
    fn extract_sparse_text(&self, image: &RgbImage) -> Result<String>;
}

/// Face detector used by the face-swap analyzer. May return an empty list.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, image: &RgbImage) -> Vec<FaceBox>;
}

/// Optional richer metadata reader that understands MakerNote namespaces.
/// Keys use the `Namespace:Tag` convention (`MakerNotes:RunTimeFlags`).
#[async_trait]
pub trait ExtendedExifReader: Send + Sync {
    async fn read_all(&self, bytes: &[u8]) -> Result<ExifMap>;
}

/// Cryptographic / content-credentials watermark probe.
///
/// Must not fail on absence; a positive result at confidence >= 0.95 is a
/// smoking gun for the fusion engine.
#[async_trait]
pub trait CredentialProbe: Send + Sync {
    async fn probe(&self, bytes: &[u8]) -> WatermarkProbe;
}

/// OCR engine placeholder for deployments without one installed.
#[derive(Debug, Default)]
pub struct OcrUnavailable;

impl OcrEngine for OcrUnavailable {
    fn extract_sparse_text(&self, _image: &RgbImage) -> Result<String> {
        Err(Error::DetectorUnavailable("no OCR engine installed".into()))
    }
}

/// Fallback face detector: one coarse box over the central 60% of the
/// image, at reduced confidence. Keeps the face-swap checks running with
/// an honest weight when no real detector is installed.
#[derive(Debug, Default)]
pub struct CentralRegionFaces;

impl FaceDetector for CentralRegionFaces {
    fn detect_faces(&self, image: &RgbImage) -> Vec<FaceBox> {
        let (w, h) = (image.width(), image.height());
        if w < 10 || h < 10 {
            return Vec::new();
        }
        vec![FaceBox {
            x1: w / 5,
            y1: h / 5,
            x2: w * 4 / 5,
            y2: h * 4 / 5,
            confidence: 0.5,
            coarse_fallback: true,
        }]
    }
}

/// Extended reader placeholder; contributes no extra fields.
#[derive(Debug, Default)]
pub struct NoExtendedReader;

#[async_trait]
impl ExtendedExifReader for NoExtendedReader {
    async fn read_all(&self, _bytes: &[u8]) -> Result<ExifMap> {
        Ok(ExifMap::new())
    }
}

/// Structural content-credentials probe.
///
/// Looks for C2PA manifests the container itself exposes: JUMBF boxes in
/// JPEG APP11 segments and `urn:c2pa` / `c2pa.` manifest references in the
/// XMP packet. Model-based watermarks (SynthID, Meta) need their vendor
/// services and stay behind this same trait.
#[derive(Debug, Default)]
pub struct StructuralCredentialProbe;

#[async_trait]
impl CredentialProbe for StructuralCredentialProbe {
    async fn probe(&self, bytes: &[u8]) -> WatermarkProbe {
        if let Ok(metadata) = jpeg::scan(bytes) {
            for payload in &metadata.jumbf {
                if contains(payload, b"c2pa") {
                    debug!("C2PA manifest found in APP11 JUMBF segment");
                    let mut probe = WatermarkProbe {
                        detected: true,
                        kind: "c2pa".into(),
                        confidence: 0.97,
                        metadata: Default::default(),
                    };
                    probe
                        .metadata
                        .insert("container".into(), "jumbf".into());
                    probe
                        .metadata
                        .insert("manifest_bytes".into(), payload.len().to_string());
                    return probe;
                }
            }
        }

        if let Some(packet) = crate::exif::xmp::extract_packet(bytes) {
            let lower = packet.to_lowercase();
            if lower.contains("urn:c2pa") || lower.contains("c2pa.manifest") {
                debug!("C2PA manifest reference found in XMP");
                let mut probe = WatermarkProbe {
                    detected: true,
                    kind: "c2pa".into(),
                    confidence: 0.95,
                    metadata: Default::default(),
                };
                probe.metadata.insert("container".into(), "xmp".into());
                return probe;
            }
        }

        WatermarkProbe::absent()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// The full collaborator set handed to the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub ocr: Arc<dyn OcrEngine>,
    pub faces: Arc<dyn FaceDetector>,
    pub extended_exif: Arc<dyn ExtendedExifReader>,
    pub credentials: Arc<dyn CredentialProbe>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators {
            ocr: Arc::new(OcrUnavailable),
            faces: Arc::new(CentralRegionFaces),
            extended_exif: Arc::new(NoExtendedReader),
            credentials: Arc::new(StructuralCredentialProbe),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Collaborators { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_fallback_covers_middle_sixty_percent() {
        let img = RgbImage::new(1000, 500);
        let faces = CentralRegionFaces.detect_faces(&img);
        assert_eq!(faces.len(), 1);
        let face = faces[0];
        assert_eq!((face.x1, face.y1, face.x2, face.y2), (200, 100, 800, 400));
        assert!(face.coarse_fallback);
        assert_eq!(face.confidence, 0.5);
    }

    #[test]
    fn tiny_images_have_no_fallback_face() {
        let img = RgbImage::new(8, 8);
        assert!(CentralRegionFaces.detect_faces(&img).is_empty());
    }

    #[tokio::test]
    async fn structural_probe_finds_jumbf_manifest() {
        let body = b"\0\0\0\x20jumb....c2pa-manifest";
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xEB];
        data.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(body);
        data.extend_from_slice(&[0xFF, 0xD9]);

        let probe = StructuralCredentialProbe.probe(&data).await;
        assert!(probe.detected);
        assert_eq!(probe.kind, "c2pa");
        assert!(probe.confidence >= 0.95);
    }

    #[tokio::test]
    async fn structural_probe_is_silent_on_clean_files() {
        let probe = StructuralCredentialProbe
            .probe(&[0xFF, 0xD8, 0xFF, 0xD9])
            .await;
        assert!(!probe.detected);
        assert_eq!(probe.kind, "none");
    }
}
