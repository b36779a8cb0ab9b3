//! EXIF payload builder for tests
//!
//! Builds syntactically valid little-endian TIFF payloads with IFD0, Exif,
//! and GPS sub-IFDs, so parser and pipeline tests can assemble realistic
//! metadata without binary fixtures.

use super::tags;

#[derive(Debug, Clone)]
struct RawEntry {
    tag: u16,
    format: u16,
    count: u32,
    payload: Vec<u8>,
}

impl RawEntry {
    fn ascii(tag: u16, value: &str) -> Self {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);
        RawEntry {
            tag,
            format: 2,
            count: payload.len() as u32,
            payload,
        }
    }

    fn u16s(tag: u16, values: &[u16]) -> Self {
        let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        RawEntry {
            tag,
            format: 3,
            count: values.len() as u32,
            payload,
        }
    }

    fn u32s(tag: u16, values: &[u32]) -> Self {
        let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        RawEntry {
            tag,
            format: 4,
            count: values.len() as u32,
            payload,
        }
    }

    fn rationals(tag: u16, values: &[(u32, u32)]) -> Self {
        let payload = values
            .iter()
            .flat_map(|(n, d)| {
                let mut bytes = n.to_le_bytes().to_vec();
                bytes.extend_from_slice(&d.to_le_bytes());
                bytes
            })
            .collect();
        RawEntry {
            tag,
            format: 5,
            count: values.len() as u32,
            payload,
        }
    }
}

/// Builder for a little-endian EXIF payload (TIFF header onward).
#[derive(Debug, Default)]
pub struct ExifBuilder {
    ifd0: Vec<RawEntry>,
    exif: Vec<RawEntry>,
    gps: Vec<RawEntry>,
}

impl ExifBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ASCII tag to IFD0.
    pub fn ascii(mut self, tag: u16, value: &str) -> Self {
        self.ifd0.push(RawEntry::ascii(tag, value));
        self
    }

    /// Add a SHORT tag to IFD0.
    pub fn u16(mut self, tag: u16, value: u16) -> Self {
        self.ifd0.push(RawEntry::u16s(tag, &[value]));
        self
    }

    /// Add an ASCII tag to the Exif sub-IFD.
    pub fn exif_ascii(mut self, tag: u16, value: &str) -> Self {
        self.exif.push(RawEntry::ascii(tag, value));
        self
    }

    /// Add a RATIONAL tag to the Exif sub-IFD.
    pub fn exif_rational(mut self, tag: u16, num: u32, den: u32) -> Self {
        self.exif.push(RawEntry::rationals(tag, &[(num, den)]));
        self
    }

    /// Add a SHORT tag to the Exif sub-IFD.
    pub fn exif_u16(mut self, tag: u16, value: u16) -> Self {
        self.exif.push(RawEntry::u16s(tag, &[value]));
        self
    }

    /// Add a GPS sub-IFD with the given DMS coordinates.
    #[allow(clippy::too_many_arguments)]
    pub fn gps(
        mut self,
        lat_deg: u32,
        lat_min: u32,
        lat_sec: f64,
        lat_ref: char,
        lon_deg: u32,
        lon_min: u32,
        lon_sec: f64,
        lon_ref: char,
    ) -> Self {
        self.gps
            .push(RawEntry::ascii(tags::GPS_LATITUDE_REF, &lat_ref.to_string()));
        self.gps.push(RawEntry::rationals(
            tags::GPS_LATITUDE,
            &[(lat_deg, 1), (lat_min, 1), ((lat_sec * 1000.0) as u32, 1000)],
        ));
        self.gps
            .push(RawEntry::ascii(tags::GPS_LONGITUDE_REF, &lon_ref.to_string()));
        self.gps.push(RawEntry::rationals(
            tags::GPS_LONGITUDE,
            &[(lon_deg, 1), (lon_min, 1), ((lon_sec * 1000.0) as u32, 1000)],
        ));
        self
    }

    /// Add a malformed GPS sub-IFD (latitude with too few components).
    pub fn gps_invalid(mut self) -> Self {
        self.gps
            .push(RawEntry::ascii(tags::GPS_LATITUDE_REF, "N"));
        self.gps
            .push(RawEntry::rationals(tags::GPS_LATITUDE, &[(52, 1)]));
        self
    }

    /// Serialize to a TIFF payload.
    pub fn build(self) -> Vec<u8> {
        let ifd_size = |n: usize| 2 + 12 * n + 4;

        let mut ifd0 = self.ifd0;
        let ifd0_count = ifd0.len()
            + usize::from(!self.exif.is_empty())
            + usize::from(!self.gps.is_empty());

        let ifd0_offset = 8usize;
        let mut next_offset = ifd0_offset + ifd_size(ifd0_count);

        let exif_offset = if self.exif.is_empty() {
            None
        } else {
            let offset = next_offset;
            next_offset += ifd_size(self.exif.len());
            Some(offset)
        };
        let gps_offset = if self.gps.is_empty() {
            None
        } else {
            let offset = next_offset;
            next_offset += ifd_size(self.gps.len());
            Some(offset)
        };
        let data_offset = next_offset;

        if let Some(offset) = exif_offset {
            ifd0.push(RawEntry::u32s(tags::TAG_EXIF_IFD, &[offset as u32]));
        }
        if let Some(offset) = gps_offset {
            ifd0.push(RawEntry::u32s(tags::TAG_GPS_IFD, &[offset as u32]));
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"II*\0");
        out.extend_from_slice(&(ifd0_offset as u32).to_le_bytes());

        let mut data: Vec<u8> = Vec::new();
        write_ifd(&mut out, &mut data, ifd0, data_offset);
        if let Some(_offset) = exif_offset {
            write_ifd(&mut out, &mut data, self.exif, data_offset);
        }
        if let Some(_offset) = gps_offset {
            write_ifd(&mut out, &mut data, self.gps, data_offset);
        }
        out.extend_from_slice(&data);
        out
    }
}

fn write_ifd(out: &mut Vec<u8>, data: &mut Vec<u8>, mut entries: Vec<RawEntry>, data_base: usize) {
    entries.sort_by_key(|e| e.tag);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in &entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.format.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.payload.len() <= 4 {
            let mut inline = entry.payload.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            let offset = (data_base + data.len()) as u32;
            out.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&entry.payload);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
}

/// Splice an EXIF APP1 segment into an existing JPEG byte stream, right
/// after SOI. Panics on non-JPEG input; test-only helper.
pub fn embed_exif_in_jpeg(jpeg: &[u8], exif_payload: &[u8]) -> Vec<u8> {
    assert!(jpeg.len() >= 2 && jpeg[0] == 0xFF && jpeg[1] == 0xD8, "not a JPEG");

    let mut segment_body = b"Exif\0\0".to_vec();
    segment_body.extend_from_slice(exif_payload);

    let mut out = Vec::with_capacity(jpeg.len() + segment_body.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((segment_body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&segment_body);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Splice an XMP APP1 segment into an existing JPEG byte stream.
pub fn embed_xmp_in_jpeg(jpeg: &[u8], xmp_packet: &str) -> Vec<u8> {
    assert!(jpeg.len() >= 2 && jpeg[0] == 0xFF && jpeg[1] == 0xD8, "not a JPEG");

    let mut segment_body = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    segment_body.extend_from_slice(xmp_packet.as_bytes());

    let mut out = Vec::with_capacity(jpeg.len() + segment_body.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((segment_body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&segment_body);
    out.extend_from_slice(&jpeg[2..]);
    out
}
