//! Post-parse normalization
//!
//! Runs after raw RDF parsing unless `OmitNormalization` is set. The pass
//! upgrades legacy Dublin Core shapes, repairs alt-text arrays, migrates the
//! dynamic-media copyright, reconciles explicit aliases against their actual
//! properties, rewrites a bare-UUID object name, and sweeps empty schemas.
//!
//! The GPS timestamp repair and the audio copyright migration swallow their
//! own errors so that a damaged property cannot poison an otherwise good
//! packet.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{self, ns};
use crate::core::node::{XmpNode, ARRAY_ITEM_NAME, XML_LANG, X_DEFAULT};
use crate::core::node_utils;
use crate::core::options::{AliasForm, ParseOptions, PropertyOptions};
use crate::utils::datetime::XmpDateTime;

/// Array form a Dublin Core property must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DcForm {
    Bag,
    Seq,
    AltText,
}

const DC_ARRAY_FORMS: &[(&str, DcForm)] = &[
    ("dc:contributor", DcForm::Bag),
    ("dc:language", DcForm::Bag),
    ("dc:publisher", DcForm::Bag),
    ("dc:relation", DcForm::Bag),
    ("dc:subject", DcForm::Bag),
    ("dc:type", DcForm::Bag),
    ("dc:creator", DcForm::Seq),
    ("dc:date", DcForm::Seq),
    ("dc:description", DcForm::AltText),
    ("dc:rights", DcForm::AltText),
    ("dc:title", DcForm::AltText),
];

/// Normalize a freshly parsed tree in place.
pub(crate) fn normalize(
    root: &mut XmpNode,
    object_name: &mut String,
    options: &ParseOptions,
) -> XmpResult<()> {
    touch_up_data_model(root)?;
    if root.has_aliases {
        move_explicit_aliases(root, options.strict_aliasing)?;
    }
    tweak_old_xmp(root, object_name)?;
    node_utils::prune_empty_schemas(root);
    Ok(())
}

fn touch_up_data_model(root: &mut XmpNode) -> XmpResult<()> {
    // The DC schema may be needed as a migration target even when the packet
    // has no DC properties; if it stays empty the final sweep removes it.
    node_utils::find_create_schema_node(root, ns::DC)?;

    let schema_uris: Vec<String> = root.children().map(|s| s.name().to_string()).collect();
    for uri in schema_uris {
        match uri.as_str() {
            ns::DC => {
                if let Some(index) = root.find_child(ns::DC) {
                    let schema = root.child_mut(index).expect("schema index valid");
                    normalize_dc_arrays(schema)?;
                }
            }
            ns::EXIF => {
                if let Some(index) = root.find_child(ns::EXIF) {
                    let schema = root.child_mut(index).expect("schema index valid");
                    // A damaged timestamp must not fail the whole parse.
                    let _ = fix_gps_timestamp(schema);
                    if let Some(i) = schema.find_child("exif:UserComment") {
                        repair_alt_text(schema.child_mut(i).expect("child index valid"))?;
                    }
                }
            }
            ns::XMP_RIGHTS => {
                if let Some(index) = root.find_child(ns::XMP_RIGHTS) {
                    let schema = root.child_mut(index).expect("schema index valid");
                    if let Some(i) = schema.find_child("xmpRights:UsageTerms") {
                        repair_alt_text(schema.child_mut(i).expect("child index valid"))?;
                    }
                }
            }
            ns::XMP_DM => {
                let _ = migrate_audio_copyright(root);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Upgrade DC properties written as simple values (an Acrobat 5 quirk) into
/// their required array forms.
fn normalize_dc_arrays(dc_schema: &mut XmpNode) -> XmpResult<()> {
    for index in 1..=dc_schema.children_len() {
        let child = dc_schema.child(index).expect("child index valid");
        let Some(&(_, form)) = DC_ARRAY_FORMS
            .iter()
            .find(|(name, _)| *name == child.name())
        else {
            continue;
        };

        if !child.options().is_array() {
            // Wrap the simple value as the sole item of the required array.
            let child = dc_schema.child_mut(index).expect("child index valid");
            let mut item = std::mem::take(child);
            let array_options = match form {
                DcForm::Bag => PropertyOptions::new().set_array(true),
                DcForm::Seq => PropertyOptions::new().set_array_ordered(true),
                DcForm::AltText => PropertyOptions::new().set_array_alt_text(true),
            };
            let mut array = XmpNode::new(item.name(), "", array_options);
            item.set_name(ARRAY_ITEM_NAME);
            if form == DcForm::AltText && !item.options().has_lang() {
                item.add_qualifier(XmpNode::new(
                    XML_LANG,
                    X_DEFAULT,
                    PropertyOptions::new(),
                ))?;
            }
            array.add_child(item)?;
            *child = array;
        } else if form == DcForm::AltText && !child.options().is_array_alt_text() {
            let child = dc_schema.child_mut(index).expect("child index valid");
            repair_alt_text(child)?;
        }
    }
    Ok(())
}

/// Force an array into well-formed alt-text shape.
///
/// Non-simple items are dropped; lang-less items with values get
/// `xml:lang="x-repair"`; lang-less empty items are dropped; `x-default`
/// moves to the front.
pub(crate) fn repair_alt_text(array: &mut XmpNode) -> XmpResult<()> {
    if !array.options().is_array() {
        return Ok(());
    }
    let options = array.options().set_array_alt_text(true);
    array.set_options(options)?;

    let mut index = 1;
    while index <= array.children_len() {
        let child = array.child(index).expect("child index valid");
        if child.options().is_composite() {
            array.remove_child(index)?;
        } else if !child.options().has_lang() {
            if child.value().is_empty() {
                array.remove_child(index)?;
            } else {
                let child = array.child_mut(index).expect("child index valid");
                child.add_qualifier(XmpNode::new(XML_LANG, "x-repair", PropertyOptions::new()))?;
                index += 1;
            }
        } else {
            index += 1;
        }
    }
    node_utils::normalize_lang_array(array);
    Ok(())
}

/// Borrow the date part of `exif:DateTimeOriginal` or
/// `exif:DateTimeDigitized` for a `exif:GPSTimeStamp` that has none.
fn fix_gps_timestamp(exif_schema: &mut XmpNode) -> XmpResult<()> {
    let Some(gps_index) = exif_schema.find_child("exif:GPSTimeStamp") else {
        return Ok(());
    };
    let gps_value = exif_schema
        .child(gps_index)
        .expect("child index valid")
        .value()
        .to_string();
    let mut stamp = XmpDateTime::parse(&gps_value)?;
    if stamp.has_date && (stamp.year != 0 || stamp.month != 0 || stamp.day != 0) {
        return Ok(());
    }

    let donor = exif_schema
        .find_child("exif:DateTimeOriginal")
        .or_else(|| exif_schema.find_child("exif:DateTimeDigitized"));
    let Some(donor_index) = donor else {
        return Ok(());
    };
    let donor_value = exif_schema
        .child(donor_index)
        .expect("child index valid")
        .value()
        .to_string();
    let donor_stamp = XmpDateTime::parse(&donor_value)?;

    stamp.has_date = true;
    stamp.year = donor_stamp.year;
    stamp.month = donor_stamp.month;
    stamp.day = donor_stamp.day;
    stamp.validate()?;

    let gps = exif_schema.child_mut(gps_index).expect("child index valid");
    gps.set_value(stamp.format());
    Ok(())
}

/// Migrate `xmpDM:copyright` into `dc:rights['x-default']`.
fn migrate_audio_copyright(root: &mut XmpNode) -> XmpResult<()> {
    let Some(dm_index) = root.find_child(ns::XMP_DM) else {
        return Ok(());
    };
    let Some(copyright_index) = root
        .child(dm_index)
        .expect("schema index valid")
        .find_child("xmpDM:copyright")
    else {
        return Ok(());
    };
    let dm_value = root
        .child(dm_index)
        .expect("schema index valid")
        .child(copyright_index)
        .expect("child index valid")
        .value()
        .to_string();

    let double_lf = "\n\n";
    let dc_schema = node_utils::find_create_schema_node(root, ns::DC)?;

    let rights_index = dc_schema.find_child("dc:rights");
    match rights_index {
        None => {
            // 1. No dc:rights at all: create it from the copyright alone.
            let mut array = XmpNode::new(
                "dc:rights",
                "",
                PropertyOptions::new().set_array_alt_text(true),
            );
            node_utils::append_lang_item(&mut array, X_DEFAULT, &format!("{}{}", double_lf, dm_value))?;
            dc_schema.add_child(array)?;
        }
        Some(index) => {
            let array = dc_schema.child_mut(index).expect("child index valid");
            if !array.has_children() {
                node_utils::append_lang_item(
                    array,
                    X_DEFAULT,
                    &format!("{}{}", double_lf, dm_value),
                )?;
            } else {
                // 2. Make sure an x-default item exists, seeded from the
                // first item.
                if node_utils::lookup_language_item(array, X_DEFAULT).is_none() {
                    let first_value = array.child(1).expect("non-empty array").value().to_string();
                    node_utils::append_lang_item(array, X_DEFAULT, &first_value)?;
                }
                let xd_index = node_utils::lookup_language_item(array, X_DEFAULT)
                    .expect("x-default item just ensured");
                let xd_item = array.child_mut(xd_index).expect("item index valid");
                let xd_value = xd_item.value().to_string();

                // 3. Merge the copyright after a double linefeed.
                match xd_value.find(double_lf) {
                    None => {
                        if xd_value != dm_value {
                            xd_item.set_value(format!("{}{}{}", xd_value, double_lf, dm_value));
                        }
                    }
                    Some(lf_pos) => {
                        if xd_value[lf_pos + 2..] != dm_value {
                            xd_item.set_value(format!("{}{}", &xd_value[..lf_pos + 2], dm_value));
                        }
                    }
                }
            }
        }
    }

    // 4. The migrated property goes away.
    let dm_schema = root.child_mut(dm_index).expect("schema index valid");
    dm_schema.remove_child_by_name("xmpDM:copyright");
    Ok(())
}

/// Reconcile alias properties against their actual locations.
fn move_explicit_aliases(root: &mut XmpNode, strict_aliasing: bool) -> XmpResult<()> {
    // Pull all alias nodes out first so later moves cannot alias-collide
    // with still-unmoved siblings.
    let mut moves: Vec<(XmpNode, namespace::AliasInfo)> = Vec::new();
    for schema in &mut root.children {
        if !schema.has_aliases {
            continue;
        }
        let mut index = 1;
        while index <= schema.children_len() {
            let child = schema.child(index).expect("child index valid");
            if child.is_alias {
                if let Some(info) = namespace::find_alias(child.name()) {
                    let alias = schema.remove_child(index)?;
                    moves.push((alias, info));
                    continue;
                }
            }
            index += 1;
        }
        schema.has_aliases = false;
    }

    for (mut alias, info) in moves {
        alias.is_alias = false;
        let actual_name = info.qualified_name();
        let target_schema = node_utils::find_create_schema_node(root, &info.namespace)?;

        match info.form {
            AliasForm::Simple => match target_schema.find_child(&actual_name) {
                None => {
                    alias.set_name(actual_name);
                    target_schema.add_child(alias)?;
                }
                Some(base_index) => {
                    let base = target_schema.child(base_index).expect("child index valid");
                    if strict_aliasing && !nodes_equivalent(&alias, base) {
                        return Err(XmpError::BadXmp(format!(
                            "alias '{}' conflicts with the base property '{}'",
                            alias.name(),
                            actual_name
                        )));
                    }
                    // The base wins; the alias copy is discarded.
                }
            },
            AliasForm::ArrayItem | AliasForm::AltTextItem => {
                let array_options = if info.form == AliasForm::ArrayItem {
                    PropertyOptions::new().set_array_ordered(true)
                } else {
                    PropertyOptions::new().set_array_alt_text(true)
                };
                if target_schema.find_child(&actual_name).is_none() {
                    target_schema.add_child(XmpNode::new(&actual_name, "", array_options))?;
                }
                let array_index = target_schema
                    .find_child(&actual_name)
                    .expect("array just ensured");
                let array = target_schema
                    .child_mut(array_index)
                    .expect("array index valid");

                let item_index = if info.form == AliasForm::ArrayItem {
                    if array.has_children() {
                        Some(1)
                    } else {
                        None
                    }
                } else {
                    node_utils::lookup_language_item(array, X_DEFAULT)
                };

                match item_index {
                    None => {
                        alias.set_name(ARRAY_ITEM_NAME);
                        if info.form == AliasForm::AltTextItem && !alias.options().has_lang() {
                            alias.add_qualifier(XmpNode::new(
                                XML_LANG,
                                X_DEFAULT,
                                PropertyOptions::new(),
                            ))?;
                        }
                        if info.form == AliasForm::AltTextItem && array.has_children() {
                            array.add_child_at(1, alias)?;
                        } else {
                            array.add_child(alias)?;
                        }
                    }
                    Some(item_index) => {
                        let item = array.child(item_index).expect("item index valid");
                        if strict_aliasing && alias.value() != item.value() {
                            return Err(XmpError::BadXmp(format!(
                                "alias item conflicts with '{}'",
                                actual_name
                            )));
                        }
                    }
                }
            }
        }
    }

    root.has_aliases = false;
    Ok(())
}

/// Structural equality used by strict aliasing: value, form, fields, and
/// qualifiers, ignoring the property names at the top.
fn nodes_equivalent(a: &XmpNode, b: &XmpNode) -> bool {
    if a.value() != b.value() {
        return false;
    }
    if a.options().is_composite() != b.options().is_composite() {
        return false;
    }
    if a.children_len() != b.children_len() || a.qualifiers_len() != b.qualifiers_len() {
        return false;
    }
    for (ca, cb) in a.children().zip(b.children()) {
        if ca.name() != cb.name() || !nodes_equivalent(ca, cb) {
            return false;
        }
    }
    for (qa, qb) in a.qualifiers().zip(b.qualifiers()) {
        if qa.name() != qb.name() || qa.value() != qb.value() {
            return false;
        }
    }
    true
}

/// Move a bare-UUID object name into `xmpMM:InstanceID`.
fn tweak_old_xmp(root: &mut XmpNode, object_name: &mut String) -> XmpResult<()> {
    if !is_bare_uuid(object_name) {
        return Ok(());
    }
    let instance_id = format!("uuid:{}", object_name);
    let schema = node_utils::find_create_schema_node(root, ns::XMP_MM)?;
    if schema.find_child("xmpMM:InstanceID").is_none() {
        schema.add_child(XmpNode::new(
            "xmpMM:InstanceID",
            instance_id,
            PropertyOptions::new(),
        ))?;
    }
    object_name.clear();
    Ok(())
}

fn is_bare_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, &b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::XmpParser;

    fn parse_and_normalize(xml: &str) -> (XmpNode, String) {
        let parser = XmpParser::new(ParseOptions::default());
        let mut parsed = parser.parse_str(xml).unwrap();
        normalize(
            &mut parsed.root,
            &mut parsed.object_name,
            &ParseOptions::default(),
        )
        .unwrap();
        (parsed.root, parsed.object_name)
    }

    fn wrap(body: &str) -> String {
        format!(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/"
      xmlns:pdf="http://ns.adobe.com/pdf/1.3/" xmlns:exif="http://ns.adobe.com/exif/1.0/"
      xmlns:xmpDM="http://ns.adobe.com/xmp/1.0/DynamicMedia/">{}</rdf:Description>
</rdf:RDF>"#,
            body
        )
    }

    #[test]
    fn test_dc_single_to_bag_upgrade() {
        let (root, _) = parse_and_normalize(&wrap("<dc:subject>keyword</dc:subject>"));
        let schema = root.child(root.find_child(ns::DC).unwrap()).unwrap();
        let subject = schema.child(schema.find_child("dc:subject").unwrap()).unwrap();
        assert!(subject.options().is_array());
        assert!(!subject.options().is_array_ordered());
        assert_eq!(subject.children_len(), 1);
        assert_eq!(subject.child(1).unwrap().value(), "keyword");
    }

    #[test]
    fn test_dc_single_to_alt_text_upgrade() {
        let (root, _) = parse_and_normalize(&wrap("<dc:title>plain title</dc:title>"));
        let schema = root.child(root.find_child(ns::DC).unwrap()).unwrap();
        let title = schema.child(schema.find_child("dc:title").unwrap()).unwrap();
        assert!(title.options().is_array_alt_text());
        let item = title.child(1).unwrap();
        assert_eq!(item.lang(), Some(X_DEFAULT));
        assert_eq!(item.value(), "plain title");
    }

    #[test]
    fn test_alias_transplant() {
        let (root, _) = parse_and_normalize(&wrap("<pdf:Author>Alice</pdf:Author>"));

        // pdf:Author is gone; dc:creator holds a one-item Seq.
        assert!(root.find_child(ns::PDF).is_none());
        let dc = root.child(root.find_child(ns::DC).unwrap()).unwrap();
        let creator = dc.child(dc.find_child("dc:creator").unwrap()).unwrap();
        assert!(creator.options().is_array_ordered());
        assert_eq!(creator.children_len(), 1);
        assert_eq!(creator.child(1).unwrap().value(), "Alice");
    }

    #[test]
    fn test_alias_base_wins_when_both_present() {
        let body = r#"<pdf:Creator>AliasTool</pdf:Creator>
<xmp:CreatorTool xmlns:xmp="http://ns.adobe.com/xap/1.0/">RealTool</xmp:CreatorTool>"#;
        let (root, _) = parse_and_normalize(&wrap(body));
        let xmp = root.child(root.find_child(ns::XMP).unwrap()).unwrap();
        let tool = xmp.child(xmp.find_child("xmp:CreatorTool").unwrap()).unwrap();
        assert_eq!(tool.value(), "RealTool");
    }

    #[test]
    fn test_strict_aliasing_conflict() {
        let body = r#"<pdf:Creator>AliasTool</pdf:Creator>
<xmp:CreatorTool xmlns:xmp="http://ns.adobe.com/xap/1.0/">RealTool</xmp:CreatorTool>"#;
        let parser = XmpParser::new(ParseOptions::default());
        let mut parsed = parser.parse_str(&wrap(body)).unwrap();
        let result = normalize(
            &mut parsed.root,
            &mut parsed.object_name,
            &ParseOptions::default().strict_aliasing(true),
        );
        assert!(matches!(result, Err(XmpError::BadXmp(_))));
    }

    #[test]
    fn test_gps_timestamp_repair() {
        let body = r#"<exif:GPSTimeStamp>12:04:30Z</exif:GPSTimeStamp>
<exif:DateTimeOriginal>2005-09-01T14:00:00Z</exif:DateTimeOriginal>"#;
        let (root, _) = parse_and_normalize(&wrap(body));
        let exif = root.child(root.find_child(ns::EXIF).unwrap()).unwrap();
        let gps = exif.child(exif.find_child("exif:GPSTimeStamp").unwrap()).unwrap();
        assert!(gps.value().starts_with("2005-09-01T12:04:30"));
    }

    #[test]
    fn test_gps_timestamp_repair_swallows_garbage() {
        let body = r#"<exif:GPSTimeStamp>not a time</exif:GPSTimeStamp>
<exif:DateTimeOriginal>2005-09-01T14:00:00Z</exif:DateTimeOriginal>"#;
        // Must not fail the parse; the broken value stays.
        let (root, _) = parse_and_normalize(&wrap(body));
        let exif = root.child(root.find_child(ns::EXIF).unwrap()).unwrap();
        let gps = exif.child(exif.find_child("exif:GPSTimeStamp").unwrap()).unwrap();
        assert_eq!(gps.value(), "not a time");
    }

    #[test]
    fn test_audio_copyright_migration() {
        let (root, _) =
            parse_and_normalize(&wrap("<xmpDM:copyright>© Example</xmpDM:copyright>"));

        let dm = root.find_child(ns::XMP_DM);
        assert!(dm.is_none(), "emptied xmpDM schema should be swept");

        let dc = root.child(root.find_child(ns::DC).unwrap()).unwrap();
        let rights = dc.child(dc.find_child("dc:rights").unwrap()).unwrap();
        let item = rights.child(1).unwrap();
        assert_eq!(item.lang(), Some(X_DEFAULT));
        assert_eq!(item.value(), "\n\n© Example");
    }

    #[test]
    fn test_audio_copyright_appends_to_existing_rights() {
        let body = r#"<dc:rights><rdf:Alt><rdf:li xml:lang="x-default">Existing</rdf:li></rdf:Alt></dc:rights>
<xmpDM:copyright>© Example</xmpDM:copyright>"#;
        let (root, _) = parse_and_normalize(&wrap(body));
        let dc = root.child(root.find_child(ns::DC).unwrap()).unwrap();
        let rights = dc.child(dc.find_child("dc:rights").unwrap()).unwrap();
        assert_eq!(rights.child(1).unwrap().value(), "Existing\n\n© Example");
    }

    #[test]
    fn test_uuid_object_name_tweak() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="596f96e6-4bf8-4cd8-8b4e-e7d9f23f0d3c"
      xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:format>image/png</dc:format>
  </rdf:Description>
</rdf:RDF>"#;
        let (root, object_name) = parse_and_normalize(xml);
        assert!(object_name.is_empty());
        let mm = root.child(root.find_child(ns::XMP_MM).unwrap()).unwrap();
        let id = mm.child(mm.find_child("xmpMM:InstanceID").unwrap()).unwrap();
        assert_eq!(id.value(), "uuid:596f96e6-4bf8-4cd8-8b4e-e7d9f23f0d3c");
    }

    #[test]
    fn test_empty_schemas_swept() {
        let (root, _) = parse_and_normalize(&wrap("<dc:format>image/gif</dc:format>"));
        for schema in root.children() {
            assert!(schema.has_children(), "schema {} is empty", schema.name());
        }
    }

    #[test]
    fn test_repair_alt_text_shapes() {
        let mut array = XmpNode::new("x:arr", "", PropertyOptions::new().set_array(true));
        // A struct item, an empty lang-less item, a good lang-less item.
        array
            .add_child(XmpNode::new(
                ARRAY_ITEM_NAME,
                "",
                PropertyOptions::new().set_struct(true),
            ))
            .unwrap();
        array
            .add_child(XmpNode::new(ARRAY_ITEM_NAME, "", PropertyOptions::new()))
            .unwrap();
        array
            .add_child(XmpNode::new(
                ARRAY_ITEM_NAME,
                "kept",
                PropertyOptions::new(),
            ))
            .unwrap();

        repair_alt_text(&mut array).unwrap();
        assert!(array.options().is_array_alt_text());
        assert_eq!(array.children_len(), 1);
        assert_eq!(array.child(1).unwrap().lang(), Some("x-repair"));
    }

    #[test]
    fn test_is_bare_uuid() {
        assert!(is_bare_uuid("596f96e6-4bf8-4cd8-8b4e-e7d9f23f0d3c"));
        assert!(!is_bare_uuid("uuid:596f96e6-4bf8-4cd8-8b4e-e7d9f23f0d3c"));
        assert!(!is_bare_uuid("596f96e64bf84cd88b4ee7d9f23f0d3c"));
        assert!(!is_bare_uuid(""));
    }
}
