//! Shared fixtures for the integration suites

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage};

/// Textured RGB image with deterministic pseudo-noise, close enough to a
/// sensor image that the pixel detectors have something to chew on.
pub fn textured_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let seed = (x as usize)
            .wrapping_mul(2654435761)
            .wrapping_add((y as usize).wrapping_mul(40503));
        let noise = (seed % 48) as u8;
        let base_r = 90 + ((x * 60) / width.max(1)) as u8;
        let base_g = 100 + ((y * 50) / height.max(1)) as u8;
        image::Rgb([
            base_r.saturating_add(noise),
            base_g.saturating_add(noise / 2),
            80u8.saturating_add(noise),
        ])
    })
}

pub fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .unwrap();
    out
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    out
}

/// Minimal little-endian EXIF payload: IFD0 with ASCII tags only.
pub fn exif_payload(tags: &[(u16, &str)]) -> Vec<u8> {
    let mut sorted: Vec<(u16, &str)> = tags.to_vec();
    sorted.sort_by_key(|(tag, _)| *tag);

    let entry_count = sorted.len();
    let data_base = 8 + 2 + entry_count * 12 + 4;

    let mut out = Vec::new();
    out.extend_from_slice(b"II*\0");
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(entry_count as u16).to_le_bytes());

    let mut data: Vec<u8> = Vec::new();
    for (tag, value) in &sorted {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);

        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes()); // ASCII
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        if payload.len() <= 4 {
            let mut inline = payload.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&((data_base + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(&payload);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data);
    out
}

/// Splice an APP1 segment (EXIF or XMP) into a JPEG right after SOI.
fn splice_app1(jpeg: &[u8], body: &[u8]) -> Vec<u8> {
    assert!(jpeg.starts_with(&[0xFF, 0xD8]), "fixture must be a JPEG");
    let mut out = Vec::with_capacity(jpeg.len() + body.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn with_exif(jpeg: &[u8], tags: &[(u16, &str)]) -> Vec<u8> {
    let mut body = b"Exif\0\0".to_vec();
    body.extend_from_slice(&exif_payload(tags));
    splice_app1(jpeg, &body)
}

pub fn with_xmp(jpeg: &[u8], packet: &str) -> Vec<u8> {
    let mut body = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    body.extend_from_slice(packet.as_bytes());
    splice_app1(jpeg, &body)
}

/// Splice an APP11 JUMBF segment carrying a C2PA manifest marker.
pub fn with_c2pa_manifest(jpeg: &[u8]) -> Vec<u8> {
    assert!(jpeg.starts_with(&[0xFF, 0xD8]), "fixture must be a JPEG");
    let body = b"\x00\x00\x00\x28jumbc2pa.manifest synthetic fixture".to_vec();
    let mut out = Vec::with_capacity(jpeg.len() + body.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xEB]);
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Common EXIF tag ids used by the suites.
pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_SOFTWARE: u16 = 0x0131;
pub const TAG_DATETIME: u16 = 0x0132;
