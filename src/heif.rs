//! HEIF/HEIC container parsing
//!
//! HEIC files are ISO BMFF containers; the EXIF payload lives in an item
//! referenced from the `meta` box. Pixel data is HEVC and outside this
//! crate's decoders, but the metadata layers still need the EXIF, so the
//! walker locates the `meta` box and recovers the first TIFF header inside
//! it. HEIC Exif items carry a 4-byte offset prefix before the header,
//! which is skipped by scanning for the header bytes themselves.

use byteorder::{BigEndian, ByteOrder};

const BOX_HEADER_SIZE: usize = 8; // 4 bytes size + 4 bytes type
const MAX_EXIF_SIZE: usize = 1024 * 1024;

/// True when the buffer carries an ISO BMFF `ftyp` with a HEIF brand.
pub fn is_heif(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    let brand = &data[8..12];
    matches!(brand, b"heic" | b"heix" | b"hevc" | b"heim" | b"heis" | b"mif1" | b"msf1")
}

/// Extract the EXIF payload (TIFF header onward) from a HEIF container.
///
/// Returns None when no EXIF item can be located; damaged containers never
/// error out of the metadata path.
pub fn extract_exif(data: &[u8]) -> Option<Vec<u8>> {
    let meta = find_box(data, 0, data.len(), b"meta")?;
    // The meta box is a FullBox: version/flags precede the child boxes.
    let body_start = meta.start + BOX_HEADER_SIZE + 4;
    let body_end = meta.end.min(data.len());
    if body_start >= body_end {
        return None;
    }
    scan_for_tiff_header(&data[body_start..body_end])
}

#[derive(Debug)]
struct BoxInfo {
    start: usize,
    end: usize,
}

/// Walk sibling boxes in `[start, end)` looking for `box_type`.
fn find_box(data: &[u8], start: usize, end: usize, box_type: &[u8; 4]) -> Option<BoxInfo> {
    let mut pos = start;
    while pos + BOX_HEADER_SIZE <= end.min(data.len()) {
        let size32 = BigEndian::read_u32(&data[pos..pos + 4]);
        let found_type = &data[pos + 4..pos + 8];

        let (box_size, header_len) = match size32 {
            0 => ((end - pos) as u64, BOX_HEADER_SIZE), // extends to end
            1 => {
                if pos + 16 > data.len() {
                    return None;
                }
                (BigEndian::read_u64(&data[pos + 8..pos + 16]), 16)
            }
            n => (n as u64, BOX_HEADER_SIZE),
        };
        if (box_size as usize) < header_len {
            return None;
        }

        if found_type == box_type {
            return Some(BoxInfo {
                start: pos,
                end: (pos as u64 + box_size).min(end as u64) as usize,
            });
        }

        pos = (pos as u64 + box_size) as usize;
    }
    None
}

/// Find the first plausible TIFF header in a byte range and return the data
/// from there, capped to a sane EXIF size.
fn scan_for_tiff_header(range: &[u8]) -> Option<Vec<u8>> {
    for i in 0..range.len().saturating_sub(4) {
        let window = &range[i..i + 4];
        if window == [0x49, 0x49, 0x2A, 0x00] || window == [0x4D, 0x4D, 0x00, 0x2A] {
            let end = (i + MAX_EXIF_SIZE).min(range.len());
            let payload = range[i..end].to_vec();
            if payload.len() >= 8 {
                return Some(payload);
            }
        }
    }
    None
}
