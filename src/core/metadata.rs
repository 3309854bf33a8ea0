//! XMP Metadata
//!
//! [`XmpMeta`] is the facade over the metadata graph: property access through
//! the path language, array and struct operations, qualifiers, localized
//! text, typed accessors, iteration, and the parse/serialize entry points.

use crate::core::error::{XmpError, XmpResult};
use crate::core::iterator::XmpIterator;
use crate::core::node::{XmpNode, ARRAY_ITEM_NAME, XML_LANG, X_DEFAULT};
use crate::core::node_utils::{self, LangMatch};
use crate::core::normalizer;
use crate::core::options::{IterOptions, ParseOptions, PropertyOptions, SerializeOptions};
use crate::core::parser::XmpParser;
use crate::core::serializer;
use crate::core::xpath::{
    self, compose_array_item_path, compose_qualifier_path, compose_struct_field_path, XmpPath,
    XmpPathStep,
};
use crate::types::property::{bool_from_xmp, bool_to_xmp, XmpProperty};
use crate::utils::datetime::XmpDateTime;
use std::fmt;
use std::str::FromStr;

/// Array index sentinel addressing the last existing item.
pub const LAST_ITEM: i32 = -1;

/// An XMP metadata graph.
#[derive(Debug, Clone, Default)]
pub struct XmpMeta {
    root: XmpNode,
    object_name: String,
    packet_header: Option<String>,
}

impl XmpMeta {
    /// Create an empty metadata graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a packet with default options.
    pub fn parse(xml: &str) -> XmpResult<Self> {
        Self::parse_with_options(xml, ParseOptions::default())
    }

    /// Parse a packet from a string.
    pub fn parse_with_options(xml: &str, options: ParseOptions) -> XmpResult<Self> {
        let parsed = XmpParser::new(options.clone()).parse_str(xml)?;
        Self::finish_parse(parsed, &options)
    }

    /// Parse a packet from raw bytes, sniffing the encoding.
    pub fn from_buffer(buffer: &[u8]) -> XmpResult<Self> {
        Self::from_buffer_with_options(buffer, ParseOptions::default())
    }

    pub fn from_buffer_with_options(buffer: &[u8], options: ParseOptions) -> XmpResult<Self> {
        let parsed = XmpParser::new(options.clone()).parse_buffer(buffer)?;
        Self::finish_parse(parsed, &options)
    }

    fn finish_parse(
        parsed: crate::core::parser::ParsedXmp,
        options: &ParseOptions,
    ) -> XmpResult<Self> {
        let mut meta = Self {
            root: parsed.root,
            object_name: parsed.object_name,
            packet_header: parsed.packet_header,
        };
        if !options.omit_normalization {
            normalizer::normalize(&mut meta.root, &mut meta.object_name, options)?;
        }
        Ok(meta)
    }

    /// The object name, from `rdf:about`.
    pub fn name(&self) -> &str {
        &self.object_name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.object_name = name.into();
    }

    /// The `<?xpacket?>` header captured at parse time, if any.
    pub fn packet_header(&self) -> Option<&str> {
        self.packet_header.as_deref()
    }

    // ---- simple properties -------------------------------------------------

    /// Get a property.
    ///
    /// Composite nodes are reported with an empty value and their form
    /// flags; use the array and struct accessors to reach inside them.
    pub fn property(&self, schema_ns: &str, path: &str) -> Option<XmpProperty> {
        let xpath = xpath::expand_xpath(schema_ns, path).ok()?;
        let node = node_utils::find_node(&self.root, &xpath)?;
        Some(XmpProperty::new(node.value(), node.options()))
    }

    /// Check whether a property exists.
    pub fn contains_property(&self, schema_ns: &str, path: &str) -> bool {
        self.property(schema_ns, path).is_some()
    }

    /// Set a property to a simple value.
    pub fn set_property(&mut self, schema_ns: &str, path: &str, value: &str) -> XmpResult<()> {
        self.set_property_with_options(schema_ns, path, value, PropertyOptions::new())
    }

    /// Set a property, supplying explicit form options.
    ///
    /// Composite forms (array, struct) require an empty value.
    pub fn set_property_with_options(
        &mut self,
        schema_ns: &str,
        path: &str,
        value: &str,
        options: PropertyOptions,
    ) -> XmpResult<()> {
        options.check_consistency()?;
        if options.is_composite() && !value.is_empty() {
            return Err(XmpError::BadOptions(
                "composite properties cannot carry a value".to_string(),
            ));
        }

        let xpath = xpath::expand_xpath(schema_ns, path)?;
        let outcome = (|| -> XmpResult<()> {
            let node = node_utils::find_create_node(&mut self.root, &xpath)?;
            if node.options().is_composite() && !value.is_empty() {
                return Err(XmpError::BadXPath(
                    "composite nodes cannot have values".to_string(),
                ));
            }
            node.set_value(value);
            if options.bits() != 0 {
                let preserved = node.options().bits()
                    & (PropertyOptions::HAS_QUALIFIERS
                        | PropertyOptions::HAS_LANG
                        | PropertyOptions::HAS_TYPE
                        | PropertyOptions::IS_QUALIFIER);
                node.set_options(PropertyOptions::from_bits(options.bits() | preserved)?)?;
            }
            node.implicit = false;
            Ok(())
        })();

        match outcome {
            Ok(()) => {
                node_utils::apply_intermediate_forms(&mut self.root, &xpath);
                Ok(())
            }
            Err(e) => {
                node_utils::prune_implicit(&mut self.root);
                node_utils::prune_empty_schemas(&mut self.root);
                Err(e)
            }
        }
    }

    /// Delete a property. Deleting a property that does not exist is a
    /// no-op; an implicit schema left empty is reaped.
    pub fn delete_property(&mut self, schema_ns: &str, path: &str) -> XmpResult<()> {
        let xpath = xpath::expand_xpath(schema_ns, path)?;
        node_utils::delete_node(&mut self.root, &xpath);
        Ok(())
    }

    // ---- typed accessors ---------------------------------------------------

    /// Read a property as an XMP boolean.
    pub fn property_bool(&self, schema_ns: &str, path: &str) -> XmpResult<Option<bool>> {
        match self.property(schema_ns, path) {
            None => Ok(None),
            Some(prop) => bool_from_xmp(&prop.value).map(Some),
        }
    }

    pub fn set_property_bool(
        &mut self,
        schema_ns: &str,
        path: &str,
        value: bool,
    ) -> XmpResult<()> {
        self.set_property(schema_ns, path, bool_to_xmp(value))
    }

    pub fn property_i32(&self, schema_ns: &str, path: &str) -> XmpResult<Option<i32>> {
        match self.property(schema_ns, path) {
            None => Ok(None),
            Some(prop) => prop.as_i32().map(Some),
        }
    }

    pub fn set_property_i32(&mut self, schema_ns: &str, path: &str, value: i32) -> XmpResult<()> {
        self.set_property(schema_ns, path, &value.to_string())
    }

    pub fn property_i64(&self, schema_ns: &str, path: &str) -> XmpResult<Option<i64>> {
        match self.property(schema_ns, path) {
            None => Ok(None),
            Some(prop) => prop.as_i64().map(Some),
        }
    }

    pub fn set_property_i64(&mut self, schema_ns: &str, path: &str, value: i64) -> XmpResult<()> {
        self.set_property(schema_ns, path, &value.to_string())
    }

    pub fn property_f64(&self, schema_ns: &str, path: &str) -> XmpResult<Option<f64>> {
        match self.property(schema_ns, path) {
            None => Ok(None),
            Some(prop) => prop.as_f64().map(Some),
        }
    }

    pub fn set_property_f64(&mut self, schema_ns: &str, path: &str, value: f64) -> XmpResult<()> {
        self.set_property(schema_ns, path, &value.to_string())
    }

    /// Read a property as an ISO 8601 date.
    pub fn property_date(&self, schema_ns: &str, path: &str) -> XmpResult<Option<XmpDateTime>> {
        match self.property(schema_ns, path) {
            None => Ok(None),
            Some(prop) => XmpDateTime::parse(&prop.value).map(Some),
        }
    }

    pub fn set_property_date(
        &mut self,
        schema_ns: &str,
        path: &str,
        value: &XmpDateTime,
    ) -> XmpResult<()> {
        value.validate()?;
        self.set_property(schema_ns, path, &value.format())
    }

    // ---- arrays ------------------------------------------------------------

    /// Number of items in an array property; 0 when it does not exist.
    pub fn array_len(&self, schema_ns: &str, array_name: &str) -> usize {
        self.find_array(schema_ns, array_name).unwrap_or(0)
    }

    fn find_array(&self, schema_ns: &str, array_name: &str) -> Option<usize> {
        let xpath = xpath::expand_xpath(schema_ns, array_name).ok()?;
        let node = node_utils::find_node(&self.root, &xpath)?;
        node.options().is_array().then(|| node.children_len())
    }

    /// Get an array item; `LAST_ITEM` addresses the last one.
    pub fn array_item(
        &self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
    ) -> Option<XmpProperty> {
        let item_path = compose_array_item_path(array_name, item_index).ok()?;
        self.property(schema_ns, &item_path)
    }

    pub fn contains_array_item(
        &self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
    ) -> bool {
        self.array_item(schema_ns, array_name, item_index).is_some()
    }

    /// Replace an existing item, or append when the index is one past the
    /// end.
    pub fn set_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
        value: &str,
    ) -> XmpResult<()> {
        if self.find_array(schema_ns, array_name).is_none() {
            return Err(XmpError::BadXPath(format!(
                "array '{}' does not exist",
                array_name
            )));
        }
        let item_path = compose_array_item_path(array_name, item_index)?;
        self.set_property(schema_ns, &item_path, value)
    }

    /// Insert an item before the given 1-based index, shifting later items.
    pub fn insert_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
        value: &str,
    ) -> XmpResult<()> {
        let xpath = xpath::expand_xpath(schema_ns, array_name)?;
        let Some(array) = node_utils::find_node_mut(&mut self.root, xpath.steps()) else {
            return Err(XmpError::BadXPath(format!(
                "array '{}' does not exist",
                array_name
            )));
        };
        if !array.options().is_array() {
            return Err(XmpError::BadXPath(format!(
                "'{}' is not an array",
                array_name
            )));
        }
        let resolved = match item_index {
            LAST_ITEM => array.children_len() + 1,
            i if i > 0 => i as usize,
            i => return Err(XmpError::BadParam(format!("bad array index {}", i))),
        };
        array.add_child_at(resolved, XmpNode::new(ARRAY_ITEM_NAME, value, PropertyOptions::new()))
    }

    /// Append an item, creating the array with the given form when missing.
    pub fn append_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        array_options: PropertyOptions,
        value: &str,
    ) -> XmpResult<()> {
        if !array_options.is_array() || !array_options.is_only_array_options() {
            return Err(XmpError::BadOptions(
                "append requires array form options".to_string(),
            ));
        }
        if self.find_array(schema_ns, array_name).is_none() {
            self.set_property_with_options(schema_ns, array_name, "", array_options)?;
        }
        let xpath = xpath::expand_xpath(schema_ns, array_name)?;
        let array = node_utils::find_node_mut(&mut self.root, xpath.steps())
            .ok_or_else(|| XmpError::InternalFailure("array vanished after create".to_string()))?;
        array.add_child(XmpNode::new(ARRAY_ITEM_NAME, value, PropertyOptions::new()))
    }

    pub fn delete_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
    ) -> XmpResult<()> {
        let item_path = compose_array_item_path(array_name, item_index)?;
        self.delete_property(schema_ns, &item_path)
    }

    // ---- structs -----------------------------------------------------------

    pub fn struct_field(
        &self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> Option<XmpProperty> {
        let field_path =
            compose_struct_field_path(struct_name, field_ns, field_name).ok()?;
        self.property(schema_ns, &field_path)
    }

    pub fn contains_struct_field(
        &self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> bool {
        self.struct_field(schema_ns, struct_name, field_ns, field_name)
            .is_some()
    }

    pub fn set_struct_field(
        &mut self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
        value: &str,
    ) -> XmpResult<()> {
        let field_path = compose_struct_field_path(struct_name, field_ns, field_name)?;
        self.set_property(schema_ns, &field_path, value)
    }

    pub fn delete_struct_field(
        &mut self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> XmpResult<()> {
        let field_path = compose_struct_field_path(struct_name, field_ns, field_name)?;
        self.delete_property(schema_ns, &field_path)
    }

    // ---- qualifiers --------------------------------------------------------

    pub fn qualifier(
        &self,
        schema_ns: &str,
        prop_path: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> Option<XmpProperty> {
        let qual_path = compose_qualifier_path(prop_path, qual_ns, qual_name).ok()?;
        self.property(schema_ns, &qual_path)
    }

    pub fn contains_qualifier(
        &self,
        schema_ns: &str,
        prop_path: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> bool {
        self.qualifier(schema_ns, prop_path, qual_ns, qual_name)
            .is_some()
    }

    /// Set a qualifier on an existing property.
    pub fn set_qualifier(
        &mut self,
        schema_ns: &str,
        prop_path: &str,
        qual_ns: &str,
        qual_name: &str,
        value: &str,
    ) -> XmpResult<()> {
        if !self.contains_property(schema_ns, prop_path) {
            return Err(XmpError::BadXPath(format!(
                "property '{}' does not exist",
                prop_path
            )));
        }
        let qual_path = compose_qualifier_path(prop_path, qual_ns, qual_name)?;
        self.set_property(schema_ns, &qual_path, value)
    }

    pub fn delete_qualifier(
        &mut self,
        schema_ns: &str,
        prop_path: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> XmpResult<()> {
        let qual_path = compose_qualifier_path(prop_path, qual_ns, qual_name)?;
        self.delete_property(schema_ns, &qual_path)
    }

    // ---- localized text ----------------------------------------------------

    /// Select a language alternative.
    ///
    /// Returns `(value, actual_lang)` using the selection order: exact
    /// specific match, generic-prefix match, `x-default`, first item.
    pub fn localized_text(
        &self,
        schema_ns: &str,
        alt_text_name: &str,
        generic_lang: &str,
        specific_lang: &str,
    ) -> Option<(String, String)> {
        let mut xpath = xpath::expand_xpath(schema_ns, alt_text_name).ok()?;
        strip_lang_selector(&mut xpath);
        let array = node_utils::find_node(&self.root, &xpath)?;
        let choice = node_utils::choose_localized_text(array, generic_lang, specific_lang).ok()?;
        let index = choice.index()?;
        let item = array.child(index)?;
        let lang = item.lang().unwrap_or_default().to_string();
        Some((item.value().to_string(), lang))
    }

    /// Set a language alternative, maintaining the `x-default` item.
    pub fn set_localized_text(
        &mut self,
        schema_ns: &str,
        alt_text_name: &str,
        generic_lang: &str,
        specific_lang: &str,
        item_value: &str,
    ) -> XmpResult<()> {
        if specific_lang.is_empty() {
            return Err(XmpError::BadParam(
                "a specific language is required".to_string(),
            ));
        }

        let mut xpath = xpath::expand_xpath(schema_ns, alt_text_name)?;
        strip_lang_selector(&mut xpath);
        let array = node_utils::find_create_node(&mut self.root, &xpath)?;
        if !array.options().is_array() {
            if array.has_children() || !array.value().is_empty() {
                return Err(XmpError::BadXPath(format!(
                    "'{}' is not an alt-text array",
                    alt_text_name
                )));
            }
            array.set_options(PropertyOptions::new().set_array_alt_text(true))?;
            array.implicit = false;
        } else if !array.options().is_array_alt_text() {
            node_utils::detect_alt_text(array);
            if !array.options().is_array_alt_text() {
                return Err(XmpError::BadXPath(format!(
                    "'{}' is not an alt-text array",
                    alt_text_name
                )));
            }
        }

        let choice = node_utils::choose_localized_text(array, generic_lang, specific_lang)?;
        let x_default_index = node_utils::lookup_language_item(array, X_DEFAULT);

        match choice {
            LangMatch::None => {
                // First value: both the x-default and the requested language.
                node_utils::append_lang_item(array, X_DEFAULT, item_value)?;
                if specific_lang != X_DEFAULT {
                    node_utils::append_lang_item(array, specific_lang, item_value)?;
                }
            }
            LangMatch::Specific(index) => {
                let matched_x_default = array
                    .child(index)
                    .expect("match index valid")
                    .lang()
                    == Some(X_DEFAULT);
                if matched_x_default {
                    // Update every item that shared the old default value.
                    let old_value = array
                        .child(index)
                        .expect("match index valid")
                        .value()
                        .to_string();
                    for i in 1..=array.children_len() {
                        let item = array.child_mut(i).expect("item index valid");
                        if item.value() == old_value {
                            item.set_value(item_value);
                        }
                    }
                } else {
                    update_item_and_shared_default(array, index, x_default_index, item_value);
                }
            }
            LangMatch::SingleGeneric(index) => {
                update_item_and_shared_default(array, index, x_default_index, item_value);
            }
            LangMatch::XDefault(_) => {
                // The default was the only match: refresh it when it stands
                // alone, then add the requested language.
                if array.children_len() == 1 {
                    if let Some(xd) = x_default_index {
                        array
                            .child_mut(xd)
                            .expect("x-default index valid")
                            .set_value(item_value);
                    }
                }
                node_utils::append_lang_item(array, specific_lang, item_value)?;
            }
            LangMatch::MultipleGeneric(_) | LangMatch::First(_) => {
                node_utils::append_lang_item(array, specific_lang, item_value)?;
            }
        }

        // A single item without a default gets promoted alongside one.
        if node_utils::lookup_language_item(array, X_DEFAULT).is_none()
            && array.children_len() == 1
        {
            node_utils::append_lang_item(array, X_DEFAULT, item_value)?;
        }
        node_utils::normalize_lang_array(array);

        node_utils::apply_intermediate_forms(&mut self.root, &xpath);
        Ok(())
    }

    // ---- whole-graph operations --------------------------------------------

    /// Sort schemas by prefix, named children by name, qualifiers in
    /// canonical order. Array items keep their order.
    pub fn sort(&mut self) {
        self.root.sort_schemas();
        for schema in &mut self.root.children {
            schema.sort_subtree();
        }
    }

    /// Re-run normalization over the graph.
    pub fn normalize(&mut self, options: &ParseOptions) -> XmpResult<()> {
        normalizer::normalize(&mut self.root, &mut self.object_name, options)
    }

    /// Debug rendering of the whole tree.
    pub fn dump(&self) -> String {
        self.root.dump()
    }

    /// Iterate over all properties.
    pub fn iter(&self, options: IterOptions) -> XmpIterator<'_> {
        XmpIterator::over_tree(&self.root, options)
    }

    /// Iterate over one property subtree; empty if the property is missing.
    pub fn iter_property(
        &self,
        schema_ns: &str,
        path: &str,
        options: IterOptions,
    ) -> XmpIterator<'_> {
        let Ok(xpath) = xpath::expand_xpath(schema_ns, path) else {
            return XmpIterator::empty(options);
        };
        match node_utils::find_node(&self.root, &xpath) {
            Some(node) => XmpIterator::over_property(
                node,
                xpath.schema_ns().to_string(),
                xpath.to_string(),
                options,
            ),
            None => XmpIterator::empty(options),
        }
    }

    /// Serialize to bytes in the requested encoding.
    pub fn to_bytes(&self, options: SerializeOptions) -> XmpResult<Vec<u8>> {
        serializer::serialize(&self.root, &self.object_name, &options)
    }

    /// Serialize to a string (UTF-8 only).
    pub fn to_string_with_options(&self, options: SerializeOptions) -> XmpResult<String> {
        serializer::serialize_to_string(&self.root, &self.object_name, &options)
    }

    pub(crate) fn root(&self) -> &XmpNode {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut XmpNode {
        &mut self.root
    }
}

/// Localized-text operations target the array; an alias-expanded path ends
/// on the x-default item, so the trailing selector comes off.
fn strip_lang_selector(xpath: &mut XmpPath) {
    let ends_on_lang = matches!(
        xpath.steps().last(),
        Some(XmpPathStep::QualSelector { qualifier, .. }) if qualifier == XML_LANG
    );
    if ends_on_lang {
        xpath.pop();
    }
}

/// Update one item, refreshing the x-default item when it shared the old
/// value.
fn update_item_and_shared_default(
    array: &mut XmpNode,
    index: usize,
    x_default_index: Option<usize>,
    item_value: &str,
) {
    let old_value = array
        .child(index)
        .expect("match index valid")
        .value()
        .to_string();
    if let Some(xd) = x_default_index {
        if xd != index {
            let default_item = array.child_mut(xd).expect("x-default index valid");
            if default_item.value() == old_value {
                default_item.set_value(item_value);
            }
        }
    }
    array
        .child_mut(index)
        .expect("match index valid")
        .set_value(item_value);
}

impl FromStr for XmpMeta {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for XmpMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_string_with_options(SerializeOptions::default()) {
            Ok(packet) => f.write_str(&packet),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::ns;

    #[test]
    fn test_set_and_get_property() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();

        let prop = meta.property(ns::XMP, "CreatorTool").unwrap();
        assert_eq!(prop.value, "TestApp");
        assert!(prop.options.is_simple());
        assert!(meta.contains_property(ns::XMP, "CreatorTool"));
        assert!(!meta.contains_property(ns::XMP, "Nonexistent"));
    }

    #[test]
    fn test_unregistered_schema_is_an_error() {
        let mut meta = XmpMeta::new();
        assert!(matches!(
            meta.set_property("http://not.registered/", "x", "1"),
            Err(XmpError::BadSchema(_))
        ));
    }

    #[test]
    fn test_delete_property() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();
        meta.delete_property(ns::XMP, "CreatorTool").unwrap();
        assert!(!meta.contains_property(ns::XMP, "CreatorTool"));
        // Deleting again is a no-op.
        meta.delete_property(ns::XMP, "CreatorTool").unwrap();
    }

    #[test]
    fn test_array_operations() {
        let mut meta = XmpMeta::new();
        let seq = PropertyOptions::new().set_array_ordered(true);

        meta.append_array_item(ns::DC, "creator", seq, "Author1").unwrap();
        meta.append_array_item(ns::DC, "creator", seq, "Author2").unwrap();
        assert_eq!(meta.array_len(ns::DC, "creator"), 2);

        assert_eq!(meta.array_item(ns::DC, "creator", 1).unwrap().value, "Author1");
        assert_eq!(
            meta.array_item(ns::DC, "creator", LAST_ITEM).unwrap().value,
            "Author2"
        );

        meta.insert_array_item(ns::DC, "creator", 2, "Author1.5").unwrap();
        assert_eq!(meta.array_len(ns::DC, "creator"), 3);
        assert_eq!(meta.array_item(ns::DC, "creator", 2).unwrap().value, "Author1.5");

        meta.set_array_item(ns::DC, "creator", 2, "Renamed").unwrap();
        assert_eq!(meta.array_item(ns::DC, "creator", 2).unwrap().value, "Renamed");

        // One past the end appends.
        meta.set_array_item(ns::DC, "creator", 4, "Author3").unwrap();
        assert_eq!(meta.array_len(ns::DC, "creator"), 4);

        meta.delete_array_item(ns::DC, "creator", 2).unwrap();
        assert_eq!(meta.array_len(ns::DC, "creator"), 3);
        assert!(meta.contains_array_item(ns::DC, "creator", 3));
        assert!(!meta.contains_array_item(ns::DC, "creator", 4));
    }

    #[test]
    fn test_set_array_item_requires_array() {
        let mut meta = XmpMeta::new();
        assert!(matches!(
            meta.set_array_item(ns::DC, "creator", 1, "x"),
            Err(XmpError::BadXPath(_))
        ));
    }

    #[test]
    fn test_struct_operations() {
        let mut meta = XmpMeta::new();
        meta.set_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired", "True")
            .unwrap();

        let field = meta
            .struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired")
            .unwrap();
        assert_eq!(field.value, "True");

        let parent = meta.property(ns::EXIF, "Flash").unwrap();
        assert!(parent.options.is_struct());
        assert_eq!(parent.value, "");

        meta.delete_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired")
            .unwrap();
        assert!(!meta.contains_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired"));
    }

    #[test]
    fn test_qualifier_operations() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::DC, "source", "doc.pdf").unwrap();
        meta.set_qualifier(ns::DC, "source", ns::XMP_IDQ, "Scheme", "uuid")
            .unwrap();

        let qual = meta
            .qualifier(ns::DC, "source", ns::XMP_IDQ, "Scheme")
            .unwrap();
        assert_eq!(qual.value, "uuid");
        assert!(qual.options.is_qualifier());

        let prop = meta.property(ns::DC, "source").unwrap();
        assert!(prop.options.has_qualifiers());

        meta.delete_qualifier(ns::DC, "source", ns::XMP_IDQ, "Scheme")
            .unwrap();
        assert!(!meta.contains_qualifier(ns::DC, "source", ns::XMP_IDQ, "Scheme"));
        assert!(!meta.property(ns::DC, "source").unwrap().options.has_qualifiers());
    }

    #[test]
    fn test_set_qualifier_requires_property() {
        let mut meta = XmpMeta::new();
        assert!(matches!(
            meta.set_qualifier(ns::DC, "missing", ns::XMP_IDQ, "Scheme", "x"),
            Err(XmpError::BadXPath(_))
        ));
    }

    #[test]
    fn test_localized_text_x_default_promotion() {
        let mut meta = XmpMeta::new();
        meta.set_localized_text(ns::DC, "title", "", "en-US", "Hello")
            .unwrap();

        // Exactly two items, both "Hello", x-default first.
        assert_eq!(meta.array_len(ns::DC, "title"), 2);
        let first = meta.array_item(ns::DC, "title", 1).unwrap();
        let second = meta.array_item(ns::DC, "title", 2).unwrap();
        assert_eq!(first.value, "Hello");
        assert_eq!(second.value, "Hello");

        let (value, lang) = meta.localized_text(ns::DC, "title", "", X_DEFAULT).unwrap();
        assert_eq!(value, "Hello");
        assert_eq!(lang, X_DEFAULT);

        let (_, lang) = meta.localized_text(ns::DC, "title", "en", "en-US").unwrap();
        assert_eq!(lang, "en-US");
    }

    #[test]
    fn test_localized_text_updates_shared_default() {
        let mut meta = XmpMeta::new();
        meta.set_localized_text(ns::DC, "title", "", "en-US", "Hello")
            .unwrap();
        // en-US and x-default share the value, so both move together.
        meta.set_localized_text(ns::DC, "title", "", "en-US", "Goodbye")
            .unwrap();

        let (value, _) = meta.localized_text(ns::DC, "title", "", X_DEFAULT).unwrap();
        assert_eq!(value, "Goodbye");

        // A language with its own value only changes itself.
        meta.set_localized_text(ns::DC, "title", "", "de", "Hallo").unwrap();
        let (value, _) = meta.localized_text(ns::DC, "title", "", X_DEFAULT).unwrap();
        assert_eq!(value, "Goodbye");
        let (value, _) = meta.localized_text(ns::DC, "title", "de", "de").unwrap();
        assert_eq!(value, "Hallo");
    }

    #[test]
    fn test_localized_text_fallback_order() {
        let mut meta = XmpMeta::new();
        meta.set_localized_text(ns::DC, "title", "", X_DEFAULT, "Default")
            .unwrap();
        meta.set_localized_text(ns::DC, "title", "", "en-GB", "British")
            .unwrap();

        // A lone x-default tracks the first language that arrives.
        let (value, lang) = meta.localized_text(ns::DC, "title", "", X_DEFAULT).unwrap();
        assert_eq!(value, "British");
        assert_eq!(lang, X_DEFAULT);

        // Generic prefix match.
        let (value, lang) = meta.localized_text(ns::DC, "title", "en", "en-AU").unwrap();
        assert_eq!(value, "British");
        assert_eq!(lang, "en-GB");

        // A third language is added without touching the default.
        meta.set_localized_text(ns::DC, "title", "", "de", "Hallo").unwrap();
        let (value, lang) = meta.localized_text(ns::DC, "title", "fr", "fr-FR").unwrap();
        assert_eq!(value, "British");
        assert_eq!(lang, X_DEFAULT);
    }

    #[test]
    fn test_typed_accessors() {
        let mut meta = XmpMeta::new();
        meta.set_property_bool(ns::XMP_RIGHTS, "Marked", true).unwrap();
        assert_eq!(meta.property(ns::XMP_RIGHTS, "Marked").unwrap().value, "True");
        assert_eq!(meta.property_bool(ns::XMP_RIGHTS, "Marked").unwrap(), Some(true));

        meta.set_property_i32(ns::XMP, "Rating", 5).unwrap();
        assert_eq!(meta.property_i32(ns::XMP, "Rating").unwrap(), Some(5));
        assert_eq!(meta.property_i64(ns::XMP, "Rating").unwrap(), Some(5));

        meta.set_property_f64(ns::CAMERA_RAW, "Exposure", -0.5).unwrap();
        assert_eq!(meta.property_f64(ns::CAMERA_RAW, "Exposure").unwrap(), Some(-0.5));

        meta.set_property(ns::XMP, "Rating", "not a number").unwrap();
        assert!(meta.property_i32(ns::XMP, "Rating").is_err());
        assert_eq!(meta.property_i32(ns::XMP, "Missing").unwrap(), None);
    }

    #[test]
    fn test_date_accessors() {
        let mut meta = XmpMeta::new();
        let mut date = XmpDateTime::new();
        date.has_date = true;
        date.has_time = true;
        date.has_timezone = true;
        date.year = 2024;
        date.month = 6;
        date.day = 30;
        date.hour = 12;
        date.minute = 15;
        date.second = 0;

        meta.set_property_date(ns::XMP, "ModifyDate", &date).unwrap();
        assert_eq!(
            meta.property(ns::XMP, "ModifyDate").unwrap().value,
            "2024-06-30T12:15:00Z"
        );
        let read = meta.property_date(ns::XMP, "ModifyDate").unwrap().unwrap();
        assert_eq!(read.year, 2024);
        assert_eq!(read.minute, 15);
    }

    #[test]
    fn test_alias_round_trip_through_api() {
        let mut meta = XmpMeta::new();
        // Writing through the alias lands on dc:creator[1].
        meta.set_property(ns::XMP, "Author", "Alice").unwrap();
        assert_eq!(meta.array_item(ns::DC, "creator", 1).unwrap().value, "Alice");
        // Reading back through the alias sees the same node.
        assert_eq!(meta.property(ns::XMP, "Author").unwrap().value, "Alice");
    }

    #[test]
    fn test_object_name_and_dump() {
        let mut meta = XmpMeta::new();
        meta.set_name("uuid:example");
        assert_eq!(meta.name(), "uuid:example");

        meta.set_property(ns::DC, "format", "image/jpeg").unwrap();
        let dump = meta.dump();
        assert!(dump.contains("dc:format"));
        assert!(dump.contains("image/jpeg"));
    }

    #[test]
    fn test_display_and_from_str_round_trip() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();

        let packet = meta.to_string();
        let parsed: XmpMeta = packet.parse().unwrap();
        assert_eq!(
            parsed.property(ns::XMP, "CreatorTool").unwrap().value,
            "TestApp"
        );
    }

    #[test]
    fn test_sort_orders_schemas_by_prefix() {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", "x").unwrap();
        meta.set_property(ns::DC, "format", "y").unwrap();
        meta.sort();

        let schemas: Vec<String> = meta
            .iter(IterOptions::new())
            .filter(|item| item.options.is_schema_node())
            .map(|item| item.schema_ns)
            .collect();
        assert_eq!(schemas, vec![ns::DC.to_string(), ns::XMP.to_string()]);
    }
}
