//! IFD (Image File Directory) parsing
//!
//! Walks IFD0, the Exif sub-IFD, and the GPS sub-IFD of an EXIF payload and
//! renders the entries the forensic layers consume into a flat name -> string
//! map. Malformed entries are skipped, never fatal: absence of metadata is
//! itself evidence downstream.

use super::tags;
use super::ExifMap;
use crate::error::{Error, Result};

/// Byte order declared by the TIFF header marker.
///
/// Scoped to this reader: every multi-byte field below the header is read
/// through it, and nothing outside the IFD walk needs the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II" marker, little-endian.
    Intel,
    /// "MM" marker, big-endian.
    Motorola,
}

impl ByteOrder {
    fn from_marker(marker: &[u8]) -> Option<ByteOrder> {
        match marker {
            [0x49, 0x49, ..] => Some(ByteOrder::Intel),
            [0x4D, 0x4D, ..] => Some(ByteOrder::Motorola),
            _ => None,
        }
    }

    fn u16(self, bytes: &[u8]) -> u16 {
        let pair = [bytes[0], bytes[1]];
        match self {
            ByteOrder::Intel => u16::from_le_bytes(pair),
            ByteOrder::Motorola => u16::from_be_bytes(pair),
        }
    }

    fn u32(self, bytes: &[u8]) -> u32 {
        let quad = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::Intel => u32::from_le_bytes(quad),
            ByteOrder::Motorola => u32::from_be_bytes(quad),
        }
    }

    fn i32(self, bytes: &[u8]) -> i32 {
        self.u32(bytes) as i32
    }
}

/// TIFF/EXIF header
#[derive(Debug, Clone, PartialEq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub ifd0_offset: u32,
}

impl TiffHeader {
    /// Parse TIFF header from the beginning of EXIF data
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::InvalidExif("TIFF header too short".into()));
        }

        let byte_order = ByteOrder::from_marker(&data[0..2])
            .ok_or_else(|| Error::InvalidExif("invalid byte order marker".into()))?;

        let magic = byte_order.u16(&data[2..4]);
        if magic != 42 {
            return Err(Error::InvalidExif(format!("invalid TIFF magic: {magic}")));
        }

        Ok(TiffHeader {
            byte_order,
            ifd0_offset: byte_order.u32(&data[4..8]),
        })
    }
}

/// A decoded IFD entry value, reduced to the formats the validator reads.
#[derive(Debug, Clone, PartialEq)]
pub enum ExifValue {
    Ascii(String),
    U16s(Vec<u16>),
    U32s(Vec<u32>),
    Rationals(Vec<(u32, u32)>),
    SignedRationals(Vec<(i32, i32)>),
    Undefined(usize),
}

impl ExifValue {
    /// Render the value the way the rule layers match against it.
    pub fn render(&self) -> String {
        match self {
            ExifValue::Ascii(s) => s.clone(),
            ExifValue::U16s(v) if v.len() == 1 => v[0].to_string(),
            ExifValue::U16s(v) => join(v.iter()),
            ExifValue::U32s(v) if v.len() == 1 => v[0].to_string(),
            ExifValue::U32s(v) => join(v.iter()),
            ExifValue::Rationals(v) if v.len() == 1 => {
                render_rational(v[0].0 as f64, v[0].1 as f64)
            }
            ExifValue::Rationals(v) => join(
                v.iter()
                    .map(|(n, d)| render_rational(*n as f64, *d as f64)),
            ),
            ExifValue::SignedRationals(v) if v.len() == 1 => {
                render_rational(v[0].0 as f64, v[0].1 as f64)
            }
            ExifValue::SignedRationals(v) => join(
                v.iter()
                    .map(|(n, d)| render_rational(*n as f64, *d as f64)),
            ),
            ExifValue::Undefined(len) => format!("(binary, {len} bytes)"),
        }
    }
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_rational(num: f64, den: f64) -> String {
    if den == 0.0 {
        return "inf".into();
    }
    let value = num / den;
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Raw GPS IFD values kept for the decimal conversion.
#[derive(Debug, Default)]
pub(crate) struct GpsRaw {
    pub latitude: Option<Vec<(u32, u32)>>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<Vec<(u32, u32)>>,
    pub longitude_ref: Option<String>,
    pub altitude: Option<(u32, u32)>,
}

/// Everything extracted from one EXIF payload.
#[derive(Debug, Default)]
pub struct ParsedExif {
    pub map: ExifMap,
    pub(crate) gps_raw: GpsRaw,
}

/// Parse an EXIF payload (TIFF header onward) into a flat tag map.
pub fn parse(data: &[u8]) -> Result<ParsedExif> {
    let header = TiffHeader::parse(data)?;
    let mut parsed = ParsedExif::default();

    let mut exif_ifd_offset = None;
    let mut gps_ifd_offset = None;

    walk_ifd(
        data,
        &header,
        header.ifd0_offset as usize,
        &mut parsed,
        &mut exif_ifd_offset,
        &mut gps_ifd_offset,
    );

    if let Some(offset) = exif_ifd_offset {
        // Pointers nested deeper than the Exif IFD are not followed.
        let (mut unused_a, mut unused_b) = (None, None);
        walk_ifd(data, &header, offset, &mut parsed, &mut unused_a, &mut unused_b);
    }
    if let Some(offset) = gps_ifd_offset {
        walk_gps_ifd(data, &header, offset, &mut parsed);
    }

    Ok(parsed)
}

fn walk_ifd(
    data: &[u8],
    header: &TiffHeader,
    offset: usize,
    parsed: &mut ParsedExif,
    exif_ifd_offset: &mut Option<usize>,
    gps_ifd_offset: &mut Option<usize>,
) {
    let Some(entries) = read_entries(data, header, offset) else {
        return;
    };

    for (tag, value) in entries {
        match tag {
            tags::TAG_EXIF_IFD => {
                if let ExifValue::U32s(v) = &value {
                    if let Some(&o) = v.first() {
                        *exif_ifd_offset = Some(o as usize);
                    }
                }
            }
            tags::TAG_GPS_IFD => {
                if let ExifValue::U32s(v) = &value {
                    if let Some(&o) = v.first() {
                        *gps_ifd_offset = Some(o as usize);
                    }
                }
            }
            _ => {
                if let Some(name) = tags::tag_name(tag) {
                    parsed
                        .map
                        .entry(name.to_string())
                        .or_insert_with(|| value.render());
                }
            }
        }
    }
}

fn walk_gps_ifd(data: &[u8], header: &TiffHeader, offset: usize, parsed: &mut ParsedExif) {
    let Some(entries) = read_entries(data, header, offset) else {
        return;
    };

    for (tag, value) in entries {
        if let Some(name) = tags::gps_tag_name(tag) {
            parsed
                .map
                .entry(name.to_string())
                .or_insert_with(|| value.render());
        }
        match (tag, &value) {
            (tags::GPS_LATITUDE_REF, ExifValue::Ascii(s)) => {
                parsed.gps_raw.latitude_ref = Some(s.clone());
            }
            (tags::GPS_LATITUDE, ExifValue::Rationals(v)) => {
                parsed.gps_raw.latitude = Some(v.clone());
            }
            (tags::GPS_LONGITUDE_REF, ExifValue::Ascii(s)) => {
                parsed.gps_raw.longitude_ref = Some(s.clone());
            }
            (tags::GPS_LONGITUDE, ExifValue::Rationals(v)) => {
                parsed.gps_raw.longitude = Some(v.clone());
            }
            (tags::GPS_ALTITUDE, ExifValue::Rationals(v)) => {
                parsed.gps_raw.altitude = v.first().copied();
            }
            _ => {}
        }
    }
}

/// Read the raw entries of a single IFD. Returns None when the directory
/// header itself is out of bounds.
fn read_entries(
    data: &[u8],
    header: &TiffHeader,
    offset: usize,
) -> Option<Vec<(u16, ExifValue)>> {
    if offset + 2 > data.len() {
        return None;
    }
    let entry_count = header.byte_order.u16(&data[offset..offset + 2]) as usize;
    let mut entries = Vec::with_capacity(entry_count.min(128));
    let mut pos = offset + 2;

    for _ in 0..entry_count {
        if pos + 12 > data.len() {
            break;
        }
        let entry = &data[pos..pos + 12];
        pos += 12;

        let tag = header.byte_order.u16(&entry[0..2]);
        let format = header.byte_order.u16(&entry[2..4]);
        let count = header.byte_order.u32(&entry[4..8]) as usize;

        let Some(component_size) = format_size(format) else {
            continue;
        };
        let Some(value_size) = component_size.checked_mul(count) else {
            continue;
        };

        let value_bytes: &[u8] = if value_size <= 4 {
            &entry[8..8 + value_size.min(4)]
        } else {
            let value_offset = header.byte_order.u32(&entry[8..12]) as usize;
            let Some(end) = value_offset.checked_add(value_size) else {
                continue;
            };
            if end > data.len() {
                continue;
            }
            &data[value_offset..end]
        };

        if let Some(value) = decode_value(format, count, value_bytes, header.byte_order) {
            entries.push((tag, value));
        }
    }

    Some(entries)
}

fn format_size(format: u16) -> Option<usize> {
    match format {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),         // SHORT, SSHORT
        4 | 9 | 11 => Some(4),    // LONG, SLONG, FLOAT
        5 | 10 | 12 => Some(8),   // RATIONAL, SRATIONAL, DOUBLE
        _ => None,
    }
}

fn decode_value(format: u16, count: usize, bytes: &[u8], order: ByteOrder) -> Option<ExifValue> {
    const MAX_COMPONENTS: usize = 4096;
    if count == 0 || count > MAX_COMPONENTS {
        return None;
    }
    match format {
        2 => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            let s = String::from_utf8_lossy(&bytes[..end]).trim().to_string();
            Some(ExifValue::Ascii(s))
        }
        1 => Some(ExifValue::U16s(bytes.iter().map(|&b| b as u16).collect())),
        3 => Some(ExifValue::U16s(
            bytes.chunks_exact(2).map(|c| order.u16(c)).collect(),
        )),
        4 => Some(ExifValue::U32s(
            bytes.chunks_exact(4).map(|c| order.u32(c)).collect(),
        )),
        5 => Some(ExifValue::Rationals(
            bytes
                .chunks_exact(8)
                .map(|c| (order.u32(&c[0..4]), order.u32(&c[4..8])))
                .collect(),
        )),
        10 => Some(ExifValue::SignedRationals(
            bytes
                .chunks_exact(8)
                .map(|c| (order.i32(&c[0..4]), order.i32(&c[4..8])))
                .collect(),
        )),
        7 => Some(ExifValue::Undefined(count)),
        _ => None,
    }
}
