//! Minimal ICC profile inspection
//!
//! The forensic layers only need a handful of facts from an ICC blob: the
//! profile description text (monitor vs camera vs editing-software
//! profiles), the format version, and the creation date. Both the v2 `desc`
//! (textDescription) and v4 `mluc` (multiLocalizedUnicode) encodings are
//! handled; anything unreadable yields None rather than an error.

use byteorder::{BigEndian, ByteOrder};

const HEADER_SIZE: usize = 128;

/// Parsed facts about an ICC profile.
#[derive(Debug, Clone, Default)]
pub struct IccSummary {
    pub description: Option<String>,
    /// "major.minor.bugfix" from header bytes 8-9.
    pub version: Option<String>,
    /// "YYYY-MM-DD" from the header dateTimeNumber.
    pub creation_date: Option<String>,
    pub size: usize,
}

/// Inspect an ICC profile blob.
///
/// Returns None only when the header itself is too short to carry the
/// mandatory fields; missing tags leave the corresponding summary fields
/// unset.
pub fn inspect(profile: &[u8]) -> Option<IccSummary> {
    if profile.len() < HEADER_SIZE + 4 {
        return None;
    }

    let mut summary = IccSummary {
        size: profile.len(),
        ..Default::default()
    };

    let major = profile[8];
    let minor = profile[9] >> 4;
    let bugfix = profile[9] & 0x0F;
    summary.version = Some(format!("{major}.{minor}.{bugfix}"));

    let year = BigEndian::read_u16(&profile[24..26]);
    let month = BigEndian::read_u16(&profile[26..28]);
    let day = BigEndian::read_u16(&profile[28..30]);
    if year > 0 && (1..=12).contains(&month) && (1..=31).contains(&day) {
        summary.creation_date = Some(format!("{year:04}-{month:02}-{day:02}"));
    }

    summary.description = find_description(profile);
    Some(summary)
}

fn find_description(profile: &[u8]) -> Option<String> {
    let tag_count = BigEndian::read_u32(&profile[HEADER_SIZE..HEADER_SIZE + 4]) as usize;
    if tag_count > 1024 {
        return None;
    }

    for i in 0..tag_count {
        let entry = HEADER_SIZE + 4 + i * 12;
        if entry + 12 > profile.len() {
            return None;
        }
        if &profile[entry..entry + 4] != b"desc" {
            continue;
        }
        let offset = BigEndian::read_u32(&profile[entry + 4..entry + 8]) as usize;
        let size = BigEndian::read_u32(&profile[entry + 8..entry + 12]) as usize;
        let end = offset.checked_add(size)?;
        if end > profile.len() || size < 12 {
            return None;
        }
        return decode_description(&profile[offset..end]);
    }
    None
}

fn decode_description(data: &[u8]) -> Option<String> {
    match &data[0..4] {
        // ICC v2 textDescription: reserved(4) + ascii length(4) + bytes
        b"desc" => {
            let len = BigEndian::read_u32(&data[8..12]) as usize;
            let start: usize = 12;
            let end = start.checked_add(len)?.min(data.len());
            let text = &data[start..end];
            let trimmed = text.split(|&b| b == 0).next().unwrap_or(text);
            Some(String::from_utf8_lossy(trimmed).trim().to_string())
        }
        // ICC v4 multiLocalizedUnicode: first record's UTF-16BE string
        b"mluc" => {
            if data.len() < 28 {
                return None;
            }
            let record_count = BigEndian::read_u32(&data[8..12]);
            if record_count == 0 {
                return None;
            }
            let length = BigEndian::read_u32(&data[20..24]) as usize;
            let offset = BigEndian::read_u32(&data[24..28]) as usize;
            let end = offset.checked_add(length)?;
            if end > data.len() {
                return None;
            }
            let utf16: Vec<u16> = data[offset..end]
                .chunks_exact(2)
                .map(BigEndian::read_u16)
                .collect();
            Some(String::from_utf16_lossy(&utf16).trim().to_string())
        }
        _ => None,
    }
}

/// Build a small, valid-enough ICC profile for tests and fixtures.
#[cfg(any(test, feature = "test-helpers"))]
pub fn synthetic_profile(description: &str, version: (u8, u8), date: (u16, u16, u16)) -> Vec<u8> {
    let mut desc_tag = b"desc".to_vec();
    desc_tag.extend_from_slice(&[0; 4]);
    desc_tag.extend_from_slice(&((description.len() + 1) as u32).to_be_bytes());
    desc_tag.extend_from_slice(description.as_bytes());
    desc_tag.push(0);

    let tag_table_len = 4 + 12;
    let desc_offset = HEADER_SIZE + tag_table_len;

    let mut profile = vec![0u8; HEADER_SIZE];
    let total = desc_offset + desc_tag.len();
    profile[0..4].copy_from_slice(&(total as u32).to_be_bytes());
    profile[8] = version.0;
    profile[9] = version.1 << 4;
    profile[12..16].copy_from_slice(b"mntr");
    profile[24..26].copy_from_slice(&date.0.to_be_bytes());
    profile[26..28].copy_from_slice(&date.1.to_be_bytes());
    profile[28..30].copy_from_slice(&date.2.to_be_bytes());

    profile.extend_from_slice(&1u32.to_be_bytes()); // tag count
    profile.extend_from_slice(b"desc");
    profile.extend_from_slice(&(desc_offset as u32).to_be_bytes());
    profile.extend_from_slice(&(desc_tag.len() as u32).to_be_bytes());
    profile.extend_from_slice(&desc_tag);
    profile
}
