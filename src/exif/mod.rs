//! EXIF / XMP metadata extraction
//!
//! Produces the flat, insertion-ordered tag map consumed by the rule
//! layers. Two sources feed the map: the built-in IFD parser and an
//! optional extended reader (which understands MakerNote namespaces);
//! extended values win on conflict. The reader never fails on malformed
//! metadata: unreadable fields are simply absent.

pub mod gps;
pub mod ifd;
pub mod tags;
pub mod xmp;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testkit;

pub use gps::GpsPosition;
pub use ifd::{ByteOrder, ExifValue, ParsedExif, TiffHeader};

use indexmap::IndexMap;
use tracing::debug;

/// Flat tag-name -> rendered-value map. Keys are case-sensitive and unique;
/// insertion order is preserved for stable output.
pub type ExifMap = IndexMap<String, String>;

/// Full metadata view for one request.
#[derive(Debug, Default)]
pub struct Metadata {
    pub map: ExifMap,
    pub gps: Option<GpsPosition>,
    /// Raw `<x:xmpmeta>` envelope, when present anywhere in the file.
    pub xmp_packet: Option<String>,
}

/// Build the metadata view from an optional EXIF payload and the raw file
/// bytes (scanned for an XMP envelope).
pub fn read_metadata(exif_payload: Option<&[u8]>, file_bytes: &[u8]) -> Metadata {
    let mut metadata = Metadata::default();

    if let Some(payload) = exif_payload {
        match ifd::parse(payload) {
            Ok(parsed) => {
                metadata.gps = gps::decimal_position(&parsed.gps_raw);
                metadata.map = parsed.map;
            }
            Err(e) => {
                // Unreadable EXIF is absence, not failure.
                debug!("EXIF parse failed, continuing without: {e}");
            }
        }
    }

    if let Some(packet) = xmp::extract_packet(file_bytes) {
        for (key, value) in xmp::properties(&packet) {
            metadata.map.entry(key).or_insert(value);
        }
        metadata.xmp_packet = Some(packet);
    }

    metadata
}

/// Merge tags from an extended reader. Extended values override built-in
/// values on conflicting keys.
pub fn merge_extended(map: &mut ExifMap, extended: ExifMap) {
    if extended.is_empty() {
        return;
    }
    let before = map.len();
    for (key, value) in extended {
        map.insert(key, value);
    }
    debug!(
        built_in = before,
        merged = map.len(),
        "merged extended metadata reader output"
    );
}
