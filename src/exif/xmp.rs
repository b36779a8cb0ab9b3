//! XMP packet extraction and property parsing
//!
//! The AI-marker layer searches the raw packet text, scoped strictly to the
//! `<x:xmpmeta>...</x:xmpmeta>` envelope so stray words elsewhere in the
//! file cannot trigger it. Structured properties (CreatorTool and friends)
//! are parsed with quick-xml and merged into the tag map under `XMP:` keys.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

const PACKET_OPEN: &[u8] = b"<x:xmpmeta";
const PACKET_CLOSE: &[u8] = b"</x:xmpmeta>";

/// Properties lifted into the tag map when present.
const KNOWN_PROPERTIES: [&str; 6] = [
    "CreatorTool",
    "CreateDate",
    "ModifyDate",
    "Credit",
    "DigitalSourceType",
    "Software",
];

/// Locate the XMP envelope anywhere in the byte stream.
///
/// Format-agnostic by design: JPEG APP1, PNG iTXt, and WebP chunks all
/// carry the same envelope, and a raw scan finds it in any of them. Bytes
/// are decoded as Latin-1 so arbitrary binary around the packet cannot
/// break the search.
pub fn extract_packet(data: &[u8]) -> Option<String> {
    let start = find_subsequence(data, PACKET_OPEN)?;
    let end = find_subsequence(&data[start..], PACKET_CLOSE)? + start + PACKET_CLOSE.len();
    Some(data[start..end].iter().map(|&b| b as char).collect())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse known properties out of an XMP packet.
///
/// Handles both serialization styles: attributes on `rdf:Description` and
/// child elements with text content. Returned keys carry the `XMP:` prefix
/// used by extended metadata readers. Parse errors end the scan with
/// whatever was collected; a damaged packet is not a pipeline failure.
pub fn properties(packet: &str) -> IndexMap<String, String> {
    let mut props = IndexMap::new();
    let mut reader = Reader::from_reader(packet.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut pending_element: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == "Description" {
                    for attr in e.attributes().flatten() {
                        let attr_local = local_name(attr.key.as_ref()).to_string();
                        if let Some(known) = known_property(&attr_local) {
                            if let Ok(value) = attr.unescape_value() {
                                props
                                    .entry(format!("XMP:{known}"))
                                    .or_insert_with(|| value.to_string());
                            }
                        }
                    }
                } else if let Some(known) = known_property(local) {
                    pending_element = Some(format!("XMP:{known}"));
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(key) = pending_element.take() {
                    if let Ok(text) = reader.decoder().decode(e) {
                        let text = text.trim();
                        if !text.is_empty() {
                            props.entry(key).or_insert_with(|| text.to_string());
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                pending_element = None;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    props
}

fn local_name(qualified: &[u8]) -> &str {
    let name = std::str::from_utf8(qualified).unwrap_or("");
    name.rsplit(':').next().unwrap_or(name)
}

fn known_property(local: &str) -> Option<&'static str> {
    KNOWN_PROPERTIES.iter().find(|&&p| p == local).copied()
}
