//! JPEG packet packaging
//!
//! JPEG APP1 segments hold at most 64 KB, so an oversized packet is split:
//! the standard packet keeps the essential properties and links to an
//! extended packet through `xmpNote:HasExtendedXMP`. Properties migrate in a
//! fixed order until the standard packet fits: thumbnails first, then the
//! whole Camera Raw schema, then the Photoshop history, then the largest
//! remaining top-level properties.

use crate::core::error::XmpResult;
use crate::core::metadata::XmpMeta;
use crate::core::namespace::ns;
use crate::core::node::XmpNode;
use crate::core::node_utils;
use crate::core::options::SerializeOptions;

/// Largest standard packet that still fits a JPEG APP1 segment.
const MAX_STANDARD_PACKET: usize = 65_000;

/// The result of packaging a graph for JPEG embedding.
#[derive(Debug, Clone)]
pub struct JpegPackets {
    /// The standard packet, always present.
    pub standard: String,
    /// The extended packet; empty when everything fit.
    pub extended: String,
    /// Digest linking the packets; empty when there is no extended packet.
    pub digest: String,
}

/// Split a metadata graph into standard and extended JPEG packets.
///
/// The standard packet is serialized read-only in compact form. When it
/// exceeds the APP1 budget, properties move into the extended graph until it
/// fits; the extended packet is serialized without the packet wrapper.
pub fn package_for_jpeg(meta: &XmpMeta) -> XmpResult<JpegPackets> {
    let standard_options = SerializeOptions::default()
        .use_compact_format(true)
        .read_only_packet(true);
    let extended_options = SerializeOptions::default()
        .use_compact_format(true)
        .omit_packet_wrapper(true);

    let mut standard_meta = meta.clone();
    let mut packet = standard_meta.to_string_with_options(standard_options.clone())?;
    if packet.len() <= MAX_STANDARD_PACKET {
        return Ok(JpegPackets {
            standard: packet,
            extended: String::new(),
            digest: String::new(),
        });
    }

    let mut extended_meta = XmpMeta::new();

    // Thumbnails are the usual offender.
    move_property(&mut standard_meta, &mut extended_meta, ns::XMP, "xmp:Thumbnails")?;
    packet = standard_meta.to_string_with_options(standard_options.clone())?;

    if packet.len() > MAX_STANDARD_PACKET {
        move_schema(&mut standard_meta, &mut extended_meta, ns::CAMERA_RAW)?;
        packet = standard_meta.to_string_with_options(standard_options.clone())?;
    }

    if packet.len() > MAX_STANDARD_PACKET {
        move_property(
            &mut standard_meta,
            &mut extended_meta,
            ns::PHOTOSHOP,
            "photoshop:History",
        )?;
        packet = standard_meta.to_string_with_options(standard_options.clone())?;
    }

    // Keep moving the biggest remaining properties until the packet fits.
    while packet.len() > MAX_STANDARD_PACKET {
        let Some((schema_ns, prop_name)) = largest_property(&standard_meta) else {
            break;
        };
        move_property(&mut standard_meta, &mut extended_meta, &schema_ns, &prop_name)?;
        packet = standard_meta.to_string_with_options(standard_options.clone())?;
    }

    let extended = extended_meta.to_string_with_options(extended_options)?;
    let digest = fnv1a128_hex(extended.as_bytes());

    standard_meta.set_property(ns::XMP_NOTE, "HasExtendedXMP", &digest)?;
    let standard = standard_meta.to_string_with_options(standard_options)?;

    Ok(JpegPackets {
        standard,
        extended,
        digest,
    })
}

/// Move one top-level property between graphs. Missing properties are a
/// no-op.
fn move_property(
    from: &mut XmpMeta,
    to: &mut XmpMeta,
    schema_ns: &str,
    prop_name: &str,
) -> XmpResult<()> {
    let Some(schema_index) = from.root().find_child(schema_ns) else {
        return Ok(());
    };
    let schema = from.root_mut().child_mut(schema_index).expect("schema index valid");
    let Some(prop_index) = schema.find_child(prop_name) else {
        return Ok(());
    };
    let node = schema.remove_child(prop_index)?;
    node_utils::prune_empty_schemas(from.root_mut());

    let target = node_utils::find_create_schema_node(to.root_mut(), schema_ns)?;
    target.add_child(node)?;
    Ok(())
}

/// Move a whole schema between graphs.
fn move_schema(from: &mut XmpMeta, to: &mut XmpMeta, schema_ns: &str) -> XmpResult<()> {
    let Some(schema_index) = from.root().find_child(schema_ns) else {
        return Ok(());
    };
    let schema = from.root_mut().remove_child(schema_index)?;
    let target = node_utils::find_create_schema_node(to.root_mut(), schema_ns)?;
    for child in schema.children {
        target.add_child(child)?;
    }
    Ok(())
}

/// Pick the top-level property with the largest estimated serialized size.
fn largest_property(meta: &XmpMeta) -> Option<(String, String)> {
    let mut best: Option<(usize, String, String)> = None;
    for schema in meta.root().children() {
        for prop in schema.children() {
            // The link property must stay in the standard packet.
            if prop.name() == "xmpNote:HasExtendedXMP" {
                continue;
            }
            let size = estimate_node_size(prop);
            if best.as_ref().map(|(s, _, _)| size > *s).unwrap_or(true) {
                best = Some((size, schema.name().to_string(), prop.name().to_string()));
            }
        }
    }
    best.map(|(_, schema_ns, prop_name)| (schema_ns, prop_name))
}

/// Rough serialized size: names, values, and markup overhead per node.
fn estimate_node_size(node: &XmpNode) -> usize {
    let mut size = 2 * node.name().len() + node.value().len() + 8;
    for qual in node.qualifiers() {
        size += estimate_node_size(qual);
    }
    for child in node.children() {
        size += estimate_node_size(child);
    }
    size
}

/// 128-bit FNV-1a over the packet bytes, rendered as 32 hex digits.
///
/// The extended-XMP link only needs a stable GUID-shaped identifier.
fn fnv1a128_hex(data: &[u8]) -> String {
    const OFFSET_BASIS: u128 = 0x6C62272E07BB014262B821756295C58D;
    const PRIME: u128 = 0x0000000001000000000000000000013B;

    let mut hash = OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u128;
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{:032X}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::PropertyOptions;

    #[test]
    fn test_small_packet_is_untouched() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "App").unwrap();

        let packets = package_for_jpeg(&meta).unwrap();
        assert!(packets.extended.is_empty());
        assert!(packets.digest.is_empty());
        assert!(packets.standard.contains("CreatorTool"));
        assert!(!packets.standard.contains("HasExtendedXMP"));
    }

    #[test]
    fn test_oversized_packet_is_split() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "App").unwrap();

        // A huge fake thumbnail array pushes the packet over the limit.
        let big = "A".repeat(30_000);
        let seq = PropertyOptions::new().set_array_ordered(true);
        for _ in 0..3 {
            meta.append_array_item(ns::XMP, "Thumbnails", seq, &big).unwrap();
        }

        let packets = package_for_jpeg(&meta).unwrap();
        assert!(packets.standard.len() <= MAX_STANDARD_PACKET);
        assert!(!packets.extended.is_empty());
        assert_eq!(packets.digest.len(), 32);

        // The link lives in the standard packet, the payload in the
        // extended one.
        assert!(packets.standard.contains("xmpNote:HasExtendedXMP"));
        assert!(packets.standard.contains(&packets.digest));
        assert!(packets.extended.contains("Thumbnails"));
        assert!(!packets.extended.contains("<?xpacket"));
        assert!(packets.standard.contains("CreatorTool"));
    }

    #[test]
    fn test_camera_raw_schema_moves_wholesale() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::CAMERA_RAW, "Version", "15.0").unwrap();
        let big = "B".repeat(70_000);
        meta.set_property(ns::CAMERA_RAW, "ToneCurve", &big).unwrap();

        let packets = package_for_jpeg(&meta).unwrap();
        assert!(packets.standard.len() <= MAX_STANDARD_PACKET);
        assert!(packets.extended.contains("crs:Version"));
        assert!(packets.extended.contains("crs:ToneCurve"));
    }

    #[test]
    fn test_fnv_digest_is_stable() {
        let a = fnv1a128_hex(b"hello");
        let b = fnv1a128_hex(b"hello");
        let c = fnv1a128_hex(b"hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
