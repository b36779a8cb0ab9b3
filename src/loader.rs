//! Image loading (decode once, downsample lazily)
//!
//! The request decodes its pixel data exactly once; detectors that want a
//! bounded working size request a capped view, which is produced on first
//! use and shared afterwards. HEIC containers are recognized so their
//! metadata can be recovered even though HEVC pixel decode is unavailable.

use crate::error::{Error, Result};
use crate::heif;
use image::imageops::FilterType;
use image::RgbImage;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Working-size caps used by the detectors.
pub const CAP_FREQUENCY: u32 = 2048;
pub const CAP_INTRINSIC: u32 = 1536;
pub const CAP_SENSOR_NOISE: u32 = 1024;
pub const CAP_PERIODIC_SAMPLING: u32 = 512;

/// Container format of the submitted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "MPO")]
    Mpo,
    #[serde(rename = "HEIC")]
    Heic,
    #[serde(rename = "WEBP")]
    Webp,
    #[serde(rename = "OTHER")]
    Other,
}

impl ImageFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Mpo => "MPO",
            ImageFormat::Heic => "HEIC",
            ImageFormat::Webp => "WEBP",
            ImageFormat::Other => "OTHER",
        }
    }

    /// Identify the container from its magic bytes.
    pub fn detect(data: &[u8]) -> ImageFormat {
        if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
            return ImageFormat::Jpeg;
        }
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            return ImageFormat::Png;
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return ImageFormat::Webp;
        }
        if heif::is_heif(data) {
            return ImageFormat::Heic;
        }
        ImageFormat::Other
    }
}

/// Decoded request image. Immutable after creation; views are cached per
/// cap so concurrent detectors share one downsample.
#[derive(Debug)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pixels: Option<Arc<RgbImage>>,
    view_frequency: OnceLock<Arc<RgbImage>>,
    view_intrinsic: OnceLock<Arc<RgbImage>>,
    view_sensor_noise: OnceLock<Arc<RgbImage>>,
    view_periodic: OnceLock<Arc<RgbImage>>,
}

impl DecodedImage {
    /// Decode the submitted bytes.
    ///
    /// Unknown containers and undecodable payloads are fatal
    /// ([`Error::InvalidFormat`]); a HEIC container is accepted without
    /// pixels so the metadata layers can still run. For MPO (multi-picture
    /// JPEG) the first frame is decoded; callers flag the format once the
    /// MPF marker has been seen.
    pub fn decode(data: &[u8]) -> Result<DecodedImage> {
        let format = ImageFormat::detect(data);
        match format {
            ImageFormat::Other => Err(Error::InvalidFormat(
                "unrecognized image container".into(),
            )),
            ImageFormat::Heic => {
                debug!("HEIC container accepted without pixel decode");
                Ok(DecodedImage::without_pixels(format))
            }
            _ => {
                let decoded = image::load_from_memory(data)
                    .map_err(|e| Error::InvalidFormat(format!("decode failed: {e}")))?;
                let rgb = decoded.to_rgb8();
                debug!(
                    width = rgb.width(),
                    height = rgb.height(),
                    format = format.name(),
                    "decoded image"
                );
                Ok(DecodedImage::from_pixels(format, rgb))
            }
        }
    }

    fn from_pixels(format: ImageFormat, rgb: RgbImage) -> DecodedImage {
        DecodedImage {
            format,
            width: rgb.width(),
            height: rgb.height(),
            pixels: Some(Arc::new(rgb)),
            view_frequency: OnceLock::new(),
            view_intrinsic: OnceLock::new(),
            view_sensor_noise: OnceLock::new(),
            view_periodic: OnceLock::new(),
        }
    }

    fn without_pixels(format: ImageFormat) -> DecodedImage {
        DecodedImage {
            format,
            width: 0,
            height: 0,
            pixels: None,
            view_frequency: OnceLock::new(),
            view_intrinsic: OnceLock::new(),
            view_sensor_noise: OnceLock::new(),
            view_periodic: OnceLock::new(),
        }
    }

    /// Construct directly from decoded pixels (test fixtures).
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn from_rgb(format: ImageFormat, rgb: RgbImage) -> DecodedImage {
        DecodedImage::from_pixels(format, rgb)
    }

    /// Construct a pixel-less container entry (test fixtures).
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn pixelless(format: ImageFormat) -> DecodedImage {
        DecodedImage::without_pixels(format)
    }

    /// Reclassify a JPEG as MPO once the APP2 MPF marker has been seen.
    pub fn mark_mpo(&mut self) {
        if self.format == ImageFormat::Jpeg {
            self.format = ImageFormat::Mpo;
        }
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    /// Full-resolution pixels.
    pub fn pixels(&self) -> Result<&Arc<RgbImage>> {
        self.pixels
            .as_ref()
            .ok_or_else(|| Error::DetectorUnavailable("no pixel data for this container".into()))
    }

    /// View with max dimension bounded by `cap`, downsampled with Lanczos3
    /// on first use. Unknown caps fall back to the full image.
    pub fn view(&self, cap: u32) -> Result<Arc<RgbImage>> {
        let full = self.pixels()?.clone();
        let slot = match cap {
            CAP_FREQUENCY => &self.view_frequency,
            CAP_INTRINSIC => &self.view_intrinsic,
            CAP_SENSOR_NOISE => &self.view_sensor_noise,
            CAP_PERIODIC_SAMPLING => &self.view_periodic,
            _ => return Ok(full),
        };
        Ok(slot
            .get_or_init(|| {
                let (w, h) = (full.width(), full.height());
                let max_dim = w.max(h);
                if max_dim <= cap {
                    return full.clone();
                }
                let scale = cap as f64 / max_dim as f64;
                let new_w = ((w as f64 * scale) as u32).max(1);
                let new_h = ((h as f64 * scale) as u32).max(1);
                debug!(from = ?(w, h), to = ?(new_w, new_h), "downsampling view");
                Arc::new(image::imageops::resize(
                    full.as_ref(),
                    new_w,
                    new_h,
                    FilterType::Lanczos3,
                ))
            })
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
        });
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90)
            .encode_image(&img)
            .unwrap();
        out
    }

    #[test]
    fn detects_formats_from_magic_bytes() {
        assert_eq!(ImageFormat::detect(&jpeg_bytes(8, 8)), ImageFormat::Jpeg);
        assert_eq!(
            ImageFormat::detect(b"\x89PNG\r\n\x1a\n rest"),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::detect(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            ImageFormat::Webp
        );
        assert_eq!(ImageFormat::detect(b"GIF89a..."), ImageFormat::Other);
    }

    #[test]
    fn decodes_jpeg_to_rgb() {
        let decoded = DecodedImage::decode(&jpeg_bytes(40, 30)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!((decoded.width, decoded.height), (40, 30));
        assert!(decoded.has_pixels());
    }

    #[test]
    fn decodes_png() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([10, 20, 30]));
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), 16, 16, image::ExtendedColorType::Rgb8)
            .unwrap();

        let decoded = DecodedImage::decode(&out).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn unknown_container_is_fatal() {
        let result = DecodedImage::decode(b"GIF89a not supported here");
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn truncated_jpeg_is_fatal() {
        let mut bytes = jpeg_bytes(64, 64);
        bytes.truncate(24);
        assert!(matches!(
            DecodedImage::decode(&bytes),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn views_downsample_and_cache() {
        let img = RgbImage::from_pixel(1200, 600, image::Rgb([128, 128, 128]));
        let decoded = DecodedImage::from_rgb(ImageFormat::Jpeg, img);

        let view = decoded.view(CAP_PERIODIC_SAMPLING).unwrap();
        assert_eq!(view.width().max(view.height()), CAP_PERIODIC_SAMPLING);
        // Aspect ratio preserved.
        assert_eq!(view.height(), 256);

        // Second request returns the cached buffer.
        let again = decoded.view(CAP_PERIODIC_SAMPLING).unwrap();
        assert!(Arc::ptr_eq(&view, &again));

        // A cap above the image size is the identity.
        let identity = decoded.view(CAP_FREQUENCY).unwrap();
        assert_eq!(identity.width(), 1200);
    }

    #[test]
    fn heic_without_pixels_reports_unavailable() {
        let mut data = Vec::new();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend_from_slice(b"ftypheic");
        data.extend_from_slice(b"mif1heic");

        let decoded = DecodedImage::decode(&data).unwrap();
        assert_eq!(decoded.format, ImageFormat::Heic);
        assert!(!decoded.has_pixels());
        assert!(decoded.pixels().is_err());
    }
}
