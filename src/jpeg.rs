//! JPEG segment scanning
//!
//! One pass over the marker stream collects every metadata segment the
//! pipeline consumes: the EXIF APP1 payload, XMP packets, the reassembled
//! ICC profile, DQT quantization tables in file order, the APP2 MPF marker
//! (multi-picture files), and APP11 JUMBF boxes (content credentials).

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// JPEG segment markers
const MARKER_SOI: u8 = 0xD8; // Start of Image
const MARKER_SOS: u8 = 0xDA; // Start of Scan (image data follows)
const MARKER_EOI: u8 = 0xD9; // End of Image
const MARKER_APP1: u8 = 0xE1;
const MARKER_APP2: u8 = 0xE2;
const MARKER_APP11: u8 = 0xEB;
const MARKER_DQT: u8 = 0xDB; // Define Quantization Table

const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_SIGNATURE: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const ICC_SIGNATURE: &[u8] = b"ICC_PROFILE\0";
const MPF_SIGNATURE: &[u8] = b"MPF\0";

/// An 8x8 quantization table extracted from a DQT segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTable {
    pub table_id: u8,
    /// Row-major 8x8 matrix in natural (not zigzag-decoded) file order.
    pub values: [[u16; 8]; 8],
}

/// XMP packet found in an APP1 segment.
#[derive(Debug, Clone)]
pub struct XmpSegment {
    pub data: Vec<u8>,
    pub is_extended: bool,
}

/// Metadata collected from one scan of a JPEG marker stream.
#[derive(Debug, Default)]
pub struct JpegMetadata {
    /// EXIF payload (TIFF header onward, signature stripped).
    pub exif: Option<Vec<u8>>,
    /// XMP segments; extended XMP chunks keep their order of appearance.
    pub xmp: Vec<XmpSegment>,
    /// Reassembled ICC profile (chunks concatenated in sequence order).
    pub icc_profile: Option<Vec<u8>>,
    /// DQT tables in the order they appear in the file.
    pub quant_tables: Vec<QuantTable>,
    /// APP2 MPF segment present (MPO / multi-picture file).
    pub has_mpf: bool,
    /// Raw APP11 JUMBF payloads (C2PA content credentials live here).
    pub jumbf: Vec<Vec<u8>>,
}

/// Scan a JPEG byte stream and collect all metadata segments.
///
/// Scanning stops at SOS; nothing after the entropy-coded data is needed.
/// Truncated files yield whatever was collected before the damage rather
/// than an error, matching how partially transferred photos arrive.
pub fn scan(data: &[u8]) -> Result<JpegMetadata> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != MARKER_SOI {
        return Err(Error::InvalidJpeg("missing SOI marker".into()));
    }

    let mut metadata = JpegMetadata::default();
    // ICC profiles split across chunks: (sequence number, payload)
    let mut icc_chunks: Vec<(u8, Vec<u8>)> = Vec::new();
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            // Padding or damage between segments; resynchronize.
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Markers with no payload (RSTn, TEM, stray SOI); EOI ends the
            // stream.
            0xD0..=0xD8 | 0x01 | 0xFF => continue,
            MARKER_EOI | MARKER_SOS => break,
            _ => {}
        }

        if pos + 2 > data.len() {
            break;
        }
        let segment_len = BigEndian::read_u16(&data[pos..pos + 2]) as usize;
        if segment_len < 2 {
            return Err(Error::InvalidJpeg("segment length below header size".into()));
        }
        let body_start = pos + 2;
        let body_end = pos + segment_len;
        if body_end > data.len() {
            break;
        }
        let body = &data[body_start..body_end];
        pos = body_end;

        match marker {
            MARKER_APP1 => parse_app1(body, &mut metadata),
            MARKER_APP2 => parse_app2(body, &mut metadata, &mut icc_chunks),
            MARKER_APP11 => {
                if body.windows(4).any(|w| w == b"jumb") {
                    metadata.jumbf.push(body.to_vec());
                }
            }
            MARKER_DQT => parse_dqt(body, &mut metadata.quant_tables),
            _ => {}
        }
    }

    if !icc_chunks.is_empty() {
        icc_chunks.sort_by_key(|(seq, _)| *seq);
        let mut profile = Vec::new();
        for (_, chunk) in icc_chunks {
            profile.extend_from_slice(&chunk);
        }
        metadata.icc_profile = Some(profile);
    }

    Ok(metadata)
}

fn parse_app1(body: &[u8], metadata: &mut JpegMetadata) {
    if body.starts_with(EXIF_SIGNATURE) {
        if metadata.exif.is_none() {
            metadata.exif = Some(body[EXIF_SIGNATURE.len()..].to_vec());
        }
    } else if body.starts_with(XMP_SIGNATURE) {
        metadata.xmp.push(XmpSegment {
            data: body[XMP_SIGNATURE.len()..].to_vec(),
            is_extended: false,
        });
    } else if body.starts_with(XMP_EXTENSION_SIGNATURE) {
        metadata.xmp.push(XmpSegment {
            data: body[XMP_EXTENSION_SIGNATURE.len()..].to_vec(),
            is_extended: true,
        });
    }
}

fn parse_app2(body: &[u8], metadata: &mut JpegMetadata, icc_chunks: &mut Vec<(u8, Vec<u8>)>) {
    if body.starts_with(ICC_SIGNATURE) {
        let rest = &body[ICC_SIGNATURE.len()..];
        // Chunk layout: sequence number (1-based), total chunk count, data.
        if rest.len() > 2 {
            icc_chunks.push((rest[0], rest[2..].to_vec()));
        }
    } else if body.starts_with(MPF_SIGNATURE) {
        metadata.has_mpf = true;
    }
}

/// Parse one DQT segment body, which may hold several tables.
fn parse_dqt(body: &[u8], tables: &mut Vec<QuantTable>) {
    let mut pos = 0;
    while pos < body.len() {
        let info = body[pos];
        let precision = (info >> 4) & 0x0F; // 0 = 8-bit, 1 = 16-bit entries
        let table_id = info & 0x0F;
        pos += 1;

        let entry_size = if precision == 0 { 1 } else { 2 };
        let table_size = 64 * entry_size;
        if pos + table_size > body.len() {
            return;
        }

        let mut values = [[0u16; 8]; 8];
        for i in 0..64 {
            let value = if precision == 0 {
                body[pos + i] as u16
            } else {
                BigEndian::read_u16(&body[pos + i * 2..pos + i * 2 + 2])
            };
            values[i / 8][i % 8] = value;
        }
        tables.push(QuantTable { table_id, values });
        pos += table_size;
    }
}
