//! XMP RDF/XML parser
//!
//! Maps the constrained RDF/XML serialization of XMP onto the node graph.
//! The XML event stream from quick-xml is first collected into a small
//! element tree with namespaces resolved, then dispatched through the RDF
//! productions: node elements, property element lists, and the
//! resource/literal/parseType-Resource/empty property element forms.
//!
//! DOCTYPE declarations are refused by default. When they are re-enabled,
//! DTD-defined entities are still never expanded; any reference to one is a
//! `BadXml` error.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{self, ns};
use crate::core::node::{XmpNode, ARRAY_ITEM_NAME, RDF_TYPE, XML_LANG};
use crate::core::node_utils;
use crate::core::options::{ParseOptions, PropertyOptions};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// The raw result of a parse, before normalization.
pub(crate) struct ParsedXmp {
    pub root: XmpNode,
    pub object_name: String,
    pub packet_header: Option<String>,
}

/// RDF term classification of qualified names in the RDF namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RdfTerm {
    Other,
    Rdf,
    Id,
    About,
    ParseType,
    Resource,
    NodeId,
    Datatype,
    Description,
    Li,
    AboutEach,
    AboutEachPrefix,
    BagId,
}

fn rdf_term(ns_uri: &str, local: &str) -> RdfTerm {
    if ns_uri != ns::RDF {
        return RdfTerm::Other;
    }
    match local {
        "RDF" => RdfTerm::Rdf,
        "ID" => RdfTerm::Id,
        "about" => RdfTerm::About,
        "parseType" => RdfTerm::ParseType,
        "resource" => RdfTerm::Resource,
        "nodeID" => RdfTerm::NodeId,
        "datatype" => RdfTerm::Datatype,
        "Description" => RdfTerm::Description,
        "li" => RdfTerm::Li,
        "aboutEach" => RdfTerm::AboutEach,
        "aboutEachPrefix" => RdfTerm::AboutEachPrefix,
        "bagID" => RdfTerm::BagId,
        _ => RdfTerm::Other,
    }
}

fn is_old_term(term: RdfTerm) -> bool {
    matches!(
        term,
        RdfTerm::AboutEach | RdfTerm::AboutEachPrefix | RdfTerm::BagId
    )
}

/// A resolved XML element.
struct XmlElem {
    ns: String,
    local: String,
    attrs: Vec<XmlAttr>,
    children: Vec<XmlElem>,
    text: String,
    has_text: bool,
}

struct XmlAttr {
    ns: String,
    local: String,
    value: String,
}

impl XmlElem {
    fn is_rdf(&self, local: &str) -> bool {
        self.ns == ns::RDF && self.local == local
    }
}

/// Parser for XMP packets.
pub struct XmpParser {
    options: ParseOptions,
}

impl XmpParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parse from raw bytes, sniffing the encoding from the BOM or the
    /// leading bytes. UTF-32 input is refused.
    pub(crate) fn parse_buffer(&self, buffer: &[u8]) -> XmpResult<ParsedXmp> {
        let text = decode_buffer(buffer, self.options.accept_latin1)?;
        self.parse_str(&text)
    }

    /// Parse from a string.
    pub(crate) fn parse_str(&self, xml: &str) -> XmpResult<ParsedXmp> {
        let scrubbed;
        let xml = if self.options.fix_control_chars {
            scrubbed = fix_control_chars(xml);
            &scrubbed
        } else {
            xml
        };

        let packet_header = extract_packet_header(xml);
        let top_level = self.build_tree(xml)?;

        let rdf = find_rdf_root(&top_level, self.options.require_xmp_meta).ok_or_else(|| {
            if self.options.require_xmp_meta {
                XmpError::BadXmp("x:xmpmeta element not found".to_string())
            } else {
                XmpError::BadXmp("rdf:RDF element not found".to_string())
            }
        })?;

        let mut parsed = ParsedXmp {
            root: XmpNode::new_root(),
            object_name: String::new(),
            packet_header,
        };
        for child in &rdf.children {
            self.rdf_node_element(&mut parsed, child)?;
        }
        Ok(parsed)
    }

    /// Collect the XML event stream into a resolved element tree.
    fn build_tree(&self, xml: &str) -> XmpResult<Vec<XmlElem>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut scopes: Vec<HashMap<String, String>> = vec![base_scope()];
        let mut open: Vec<XmlElem> = Vec::new();
        let mut top_level: Vec<XmlElem> = Vec::new();
        let mut doctype_seen = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let elem = open_element(&e, &mut scopes)?;
                    open.push(elem);
                }
                Ok(Event::Empty(e)) => {
                    let elem = open_element(&e, &mut scopes)?;
                    scopes.pop();
                    attach(elem, &mut open, &mut top_level);
                }
                Ok(Event::End(_)) => {
                    scopes.pop();
                    if let Some(elem) = open.pop() {
                        attach(elem, &mut open, &mut top_level);
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).to_string();
                    let text = unescape(&raw).map_err(|err| {
                        XmpError::bad_xml(format!("bad entity reference: {}", err))
                    })?;
                    if let Some(elem) = open.last_mut() {
                        if !text.is_empty() {
                            elem.text.push_str(&text);
                            elem.has_text = true;
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw).to_string();
                    if let Some(elem) = open.last_mut() {
                        if !text.is_empty() {
                            elem.text.push_str(&text);
                            elem.has_text = true;
                        }
                    }
                }
                Ok(Event::DocType(_)) => {
                    if !self.options.allow_doctype {
                        return Err(XmpError::bad_xml(
                            "DOCTYPE declarations are not allowed".to_string(),
                        ));
                    }
                    doctype_seen = true;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        if doctype_seen {
            check_entity_references(xml)?;
        }
        Ok(top_level)
    }

    /// Top-level node element: must be an `rdf:Description`.
    fn rdf_node_element(&self, parsed: &mut ParsedXmp, elem: &XmlElem) -> XmpResult<()> {
        match rdf_term(&elem.ns, &elem.local) {
            RdfTerm::Description => {}
            RdfTerm::Other => {
                return Err(XmpError::BadXmp(
                    "top level typed nodes are not allowed".to_string(),
                ))
            }
            _ => {
                return Err(XmpError::BadRdf(
                    "node element must be rdf:Description".to_string(),
                ))
            }
        }

        for attr in &elem.attrs {
            match rdf_term(&attr.ns, &attr.local) {
                RdfTerm::About => {
                    if parsed.object_name.is_empty() {
                        parsed.object_name = attr.value.clone();
                    } else if parsed.object_name != attr.value {
                        return Err(XmpError::BadXmp(
                            "mismatched top level rdf:about values".to_string(),
                        ));
                    }
                }
                RdfTerm::Id | RdfTerm::NodeId => {}
                term if is_old_term(term) => {
                    return Err(XmpError::BadRdf(format!(
                        "rdf:{} is not allowed in XMP",
                        attr.local
                    )))
                }
                RdfTerm::Other => {
                    if attr.ns == ns::XML {
                        continue;
                    }
                    // Compact serializations write simple properties as
                    // attributes of the description.
                    let name = node_name(&attr.ns, &attr.local)?;
                    let node = XmpNode::new(name, attr.value.clone(), PropertyOptions::new());
                    self.add_top_level(parsed, &attr.ns, node)?;
                }
                _ => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute rdf:{} for node element",
                        attr.local
                    )))
                }
            }
        }

        if elem.has_text {
            return Err(XmpError::BadRdf(
                "node element cannot have text content".to_string(),
            ));
        }
        for child in &elem.children {
            let node = self.rdf_property_element(child, false)?;
            let child_ns = effective_ns(&child.ns);
            self.add_top_level(parsed, &child_ns, node)?;
        }
        Ok(())
    }

    /// Place a parsed top-level property under its schema node, marking
    /// aliases for the normalizer.
    fn add_top_level(&self, parsed: &mut ParsedXmp, ns_uri: &str, mut node: XmpNode) -> XmpResult<()> {
        let is_alias = namespace::find_alias(node.name()).is_some();
        node.is_alias = is_alias;

        let schema = node_utils::find_create_schema_node(&mut parsed.root, &effective_ns(ns_uri))?;
        if is_alias {
            schema.has_aliases = true;
        }
        schema.add_child(node)?;
        if is_alias {
            parsed.root.has_aliases = true;
        }
        Ok(())
    }

    /// Dispatch one property element into its production.
    fn rdf_property_element(&self, elem: &XmlElem, as_array_item: bool) -> XmpResult<XmpNode> {
        let term = rdf_term(&elem.ns, &elem.local);
        let name = match term {
            RdfTerm::Li => {
                if !as_array_item {
                    return Err(XmpError::BadRdf(
                        "rdf:li is only allowed inside arrays".to_string(),
                    ));
                }
                ARRAY_ITEM_NAME.to_string()
            }
            RdfTerm::Other => {
                if as_array_item {
                    return Err(XmpError::BadRdf(
                        "array items must be rdf:li elements".to_string(),
                    ));
                }
                node_name(&elem.ns, &elem.local)?
            }
            term if is_old_term(term) => {
                return Err(XmpError::BadRdf(format!(
                    "rdf:{} is not allowed in XMP",
                    elem.local
                )))
            }
            _ => {
                return Err(XmpError::BadRdf(format!(
                    "rdf:{} is not a valid property element name",
                    elem.local
                )))
            }
        };

        if elem.attrs.len() > 3 {
            return self.rdf_empty_property_element(elem, name);
        }

        for attr in &elem.attrs {
            if attr.ns == ns::XML && attr.local == "lang" {
                continue;
            }
            match rdf_term(&attr.ns, &attr.local) {
                RdfTerm::Id => continue,
                RdfTerm::Datatype => return self.rdf_literal_property_element(elem, name),
                RdfTerm::ParseType => {
                    return match attr.value.as_str() {
                        "Resource" => self.rdf_parse_type_resource_property_element(elem, name),
                        "Literal" => Err(XmpError::BadXmp(
                            "parseType=\"Literal\" is not allowed in XMP".to_string(),
                        )),
                        "Collection" => Err(XmpError::BadXmp(
                            "parseType=\"Collection\" is not allowed in XMP".to_string(),
                        )),
                        other => Err(XmpError::BadXmp(format!(
                            "parseType=\"{}\" is not allowed in XMP",
                            other
                        ))),
                    };
                }
                RdfTerm::Resource | RdfTerm::NodeId => {
                    return self.rdf_empty_property_element(elem, name)
                }
                term if is_old_term(term) => {
                    return Err(XmpError::BadRdf(format!(
                        "rdf:{} is not allowed in XMP",
                        attr.local
                    )))
                }
                RdfTerm::Other => return self.rdf_empty_property_element(elem, name),
                _ => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute rdf:{} for property element",
                        attr.local
                    )))
                }
            }
        }

        if !elem.children.is_empty() {
            if elem.has_text {
                return Err(XmpError::BadRdf(
                    "property element cannot mix text and element content".to_string(),
                ));
            }
            self.rdf_resource_property_element(elem, name)
        } else if elem.has_text {
            self.rdf_literal_property_element(elem, name)
        } else {
            self.rdf_empty_property_element(elem, name)
        }
    }

    /// resourcePropertyElt: exactly one node element or array container.
    fn rdf_resource_property_element(&self, elem: &XmlElem, name: String) -> XmpResult<XmpNode> {
        let mut node = XmpNode::new(name, "", PropertyOptions::new());
        for attr in &elem.attrs {
            if attr.ns == ns::XML && attr.local == "lang" {
                add_lang_qualifier(&mut node, &attr.value)?;
            } else if rdf_term(&attr.ns, &attr.local) == RdfTerm::Id {
                continue;
            } else {
                return Err(XmpError::BadRdf(format!(
                    "invalid attribute '{}' for resource property element",
                    attr.local
                )));
            }
        }

        if elem.children.len() != 1 {
            return Err(XmpError::BadRdf(
                "resource property element must have exactly one child".to_string(),
            ));
        }
        let child = &elem.children[0];

        if child.is_rdf("Bag") || child.is_rdf("Seq") || child.is_rdf("Alt") {
            let mut options = PropertyOptions::new().set_array(true);
            if child.local == "Seq" {
                options = options.set_array_ordered(true);
            } else if child.local == "Alt" {
                options = options.set_array_alternate(true);
            }
            node.set_options(options)?;

            if child.has_text {
                return Err(XmpError::BadRdf(
                    "array containers cannot have text content".to_string(),
                ));
            }
            for li in &child.children {
                let item = self.rdf_property_element(li, true)?;
                node.add_child(item)?;
            }
            node_utils::detect_alt_text(&mut node);
        } else if child.is_rdf("Description") || rdf_term(&child.ns, &child.local) == RdfTerm::Other
        {
            node.options = node.options.set_struct(true);
            self.rdf_inner_node_element(&mut node, child)?;
            self.fixup_qualified_node(&mut node)?;
        } else {
            return Err(XmpError::BadRdf(format!(
                "rdf:{} is not a valid value for a resource property",
                child.local
            )));
        }
        Ok(node)
    }

    /// Inner node element: `rdf:Description` or a typed node, producing the
    /// fields of a struct.
    fn rdf_inner_node_element(&self, node: &mut XmpNode, elem: &XmlElem) -> XmpResult<()> {
        if rdf_term(&elem.ns, &elem.local) == RdfTerm::Other && !elem.is_rdf("Description") {
            // Typed node: the type becomes an rdf:type qualifier.
            let type_uri = format!("{}{}", elem.ns, elem.local);
            add_unique_qualifier(
                node,
                XmpNode::new(RDF_TYPE, type_uri, PropertyOptions::new().set_uri(true)),
            )?;
        }

        for attr in &elem.attrs {
            match rdf_term(&attr.ns, &attr.local) {
                RdfTerm::Id | RdfTerm::NodeId | RdfTerm::About => {}
                term if is_old_term(term) => {
                    return Err(XmpError::BadRdf(format!(
                        "rdf:{} is not allowed in XMP",
                        attr.local
                    )))
                }
                RdfTerm::Other => {
                    if attr.ns == ns::XML {
                        continue;
                    }
                    let field_name = node_name(&attr.ns, &attr.local)?;
                    self.note_value_child(node, &field_name);
                    let field = XmpNode::new(field_name, attr.value.clone(), PropertyOptions::new());
                    node.add_child(field)?;
                }
                _ => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute rdf:{} for inner node element",
                        attr.local
                    )))
                }
            }
        }

        if elem.has_text {
            return Err(XmpError::BadRdf(
                "node element cannot have text content".to_string(),
            ));
        }
        for child in &elem.children {
            let field = self.rdf_property_element(child, false)?;
            self.note_value_child(node, field.name());
            node.add_child(field)?;
        }
        Ok(())
    }

    /// parseTypeResourcePropertyElt: a struct written without the inner
    /// `rdf:Description`.
    fn rdf_parse_type_resource_property_element(
        &self,
        elem: &XmlElem,
        name: String,
    ) -> XmpResult<XmpNode> {
        let mut node = XmpNode::new(name, "", PropertyOptions::new().set_struct(true));
        for attr in &elem.attrs {
            if attr.ns == ns::XML && attr.local == "lang" {
                add_lang_qualifier(&mut node, &attr.value)?;
            } else {
                match rdf_term(&attr.ns, &attr.local) {
                    RdfTerm::Id | RdfTerm::ParseType => {}
                    _ => {
                        return Err(XmpError::BadRdf(format!(
                            "invalid attribute '{}' for parseType=\"Resource\" element",
                            attr.local
                        )))
                    }
                }
            }
        }

        if elem.has_text {
            return Err(XmpError::BadRdf(
                "parseType=\"Resource\" element cannot have text content".to_string(),
            ));
        }
        for child in &elem.children {
            let field = self.rdf_property_element(child, false)?;
            self.note_value_child(&mut node, field.name());
            node.add_child(field)?;
        }
        self.fixup_qualified_node(&mut node)?;
        Ok(node)
    }

    /// literalPropertyElt: text content only.
    fn rdf_literal_property_element(&self, elem: &XmlElem, name: String) -> XmpResult<XmpNode> {
        if !elem.children.is_empty() {
            return Err(XmpError::BadRdf(
                "literal property element cannot have element content".to_string(),
            ));
        }
        let mut node = XmpNode::new(name, elem.text.clone(), PropertyOptions::new());
        for attr in &elem.attrs {
            if attr.ns == ns::XML && attr.local == "lang" {
                add_lang_qualifier(&mut node, &attr.value)?;
                continue;
            }
            match rdf_term(&attr.ns, &attr.local) {
                RdfTerm::Id => {}
                RdfTerm::Datatype => {
                    add_unique_qualifier(
                        &mut node,
                        XmpNode::new(
                            RDF_TYPE,
                            attr.value.clone(),
                            PropertyOptions::new().set_uri(true),
                        ),
                    )?;
                }
                _ => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute '{}' for literal property element",
                        attr.local
                    )))
                }
            }
        }
        Ok(node)
    }

    /// emptyPropertyElt: value carried by attributes, if at all.
    fn rdf_empty_property_element(&self, elem: &XmlElem, name: String) -> XmpResult<XmpNode> {
        if !elem.children.is_empty() {
            return Err(XmpError::BadRdf(
                "empty property element cannot have element content".to_string(),
            ));
        }
        if elem.has_text {
            return Err(XmpError::BadXmp(
                "empty property element cannot have a value".to_string(),
            ));
        }

        let mut lang: Option<&str> = None;
        let mut value_attr: Option<&str> = None;
        let mut resource_attr: Option<&str> = None;
        let mut prop_attrs: Vec<&XmlAttr> = Vec::new();

        for attr in &elem.attrs {
            if attr.ns == ns::XML && attr.local == "lang" {
                lang = Some(&attr.value);
                continue;
            }
            match rdf_term(&attr.ns, &attr.local) {
                RdfTerm::Id | RdfTerm::NodeId => {}
                RdfTerm::Resource => resource_attr = Some(&attr.value),
                RdfTerm::ParseType | RdfTerm::Datatype => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute rdf:{} for empty property element",
                        attr.local
                    )))
                }
                term if is_old_term(term) => {
                    return Err(XmpError::BadRdf(format!(
                        "rdf:{} is not allowed in XMP",
                        attr.local
                    )))
                }
                RdfTerm::Other => {
                    if attr.ns == ns::RDF && attr.local == "value" {
                        value_attr = Some(&attr.value);
                    } else {
                        prop_attrs.push(attr);
                    }
                }
                _ => {
                    return Err(XmpError::BadRdf(format!(
                        "invalid attribute rdf:{} for empty property element",
                        attr.local
                    )))
                }
            }
        }

        if value_attr.is_some() && resource_attr.is_some() {
            return Err(XmpError::BadXmp(
                "rdf:value and rdf:resource cannot both be present".to_string(),
            ));
        }

        let mut node = if let Some(value) = value_attr {
            // rdf:value carries the value; remaining attributes qualify it.
            let mut node = XmpNode::new(name, value, PropertyOptions::new());
            for attr in &prop_attrs {
                let qual_name = node_name(&attr.ns, &attr.local)?;
                add_unique_qualifier(
                    &mut node,
                    XmpNode::new(qual_name, attr.value.clone(), PropertyOptions::new()),
                )?;
            }
            node
        } else if let Some(uri) = resource_attr {
            let mut node = XmpNode::new(name, uri, PropertyOptions::new().set_uri(true));
            for attr in &prop_attrs {
                let qual_name = node_name(&attr.ns, &attr.local)?;
                add_unique_qualifier(
                    &mut node,
                    XmpNode::new(qual_name, attr.value.clone(), PropertyOptions::new()),
                )?;
            }
            node
        } else if !prop_attrs.is_empty() {
            // Attributes become the fields of a struct.
            let mut node = XmpNode::new(name, "", PropertyOptions::new().set_struct(true));
            for attr in &prop_attrs {
                let field_name = node_name(&attr.ns, &attr.local)?;
                node.add_child(XmpNode::new(
                    field_name,
                    attr.value.clone(),
                    PropertyOptions::new(),
                ))?;
            }
            node
        } else {
            XmpNode::new(name, "", PropertyOptions::new())
        };

        if let Some(lang) = lang {
            add_lang_qualifier(&mut node, lang)?;
        }
        Ok(node)
    }

    fn note_value_child(&self, node: &mut XmpNode, child_name: &str) {
        if child_name == "rdf:value" {
            node.has_value_child = true;
        }
    }

    /// Collapse an `rdf:value` child: the child's value becomes the node's
    /// value and every sibling becomes a qualifier.
    fn fixup_qualified_node(&self, node: &mut XmpNode) -> XmpResult<()> {
        if !node.has_value_child {
            return Ok(());
        }
        node.has_value_child = false;

        let value_index = node
            .find_child("rdf:value")
            .ok_or_else(|| XmpError::InternalFailure("rdf:value child vanished".to_string()))?;
        let value_node = node.remove_child(value_index)?;
        if !value_node.options().is_simple() {
            return Err(XmpError::BadXmp(
                "rdf:value must be a simple value".to_string(),
            ));
        }

        node.set_value(value_node.value());
        node.options = node
            .options
            .set_struct(false)
            .set_uri(value_node.options().is_uri());

        for qual in value_node.qualifiers.clone() {
            add_unique_qualifier(node, qual)?;
        }

        let siblings: Vec<XmpNode> = std::mem::take(&mut node.children);
        for sibling in siblings {
            add_unique_qualifier(node, sibling)?;
        }
        Ok(())
    }
}

/// Add a qualifier, refusing duplicates (parse-time rule).
fn add_unique_qualifier(node: &mut XmpNode, qualifier: XmpNode) -> XmpResult<()> {
    if node.find_qualifier(qualifier.name()).is_some() {
        return Err(XmpError::BadXmp(format!(
            "duplicate qualifier '{}'",
            qualifier.name()
        )));
    }
    node.add_qualifier(qualifier)
}

fn add_lang_qualifier(node: &mut XmpNode, lang: &str) -> XmpResult<()> {
    add_unique_qualifier(
        node,
        XmpNode::new(XML_LANG, lang, PropertyOptions::new()),
    )
}

/// Map the legacy Dublin Core URI onto the canonical one.
fn effective_ns(ns_uri: &str) -> String {
    if ns_uri == ns::DC_DEPRECATED || ns_uri == "http://purl.org/dc/1.1" {
        ns::DC.to_string()
    } else {
        ns_uri.to_string()
    }
}

/// Build the stored node name `prefix:local` for a namespaced XML name.
fn node_name(ns_uri: &str, local: &str) -> XmpResult<String> {
    if ns_uri.is_empty() {
        return Err(XmpError::BadRdf(format!(
            "XML namespace required for all elements and attributes, missing on '{}'",
            local
        )));
    }
    let uri = effective_ns(ns_uri);
    let prefix = match namespace::prefix_for_uri(&uri) {
        Some(prefix) => prefix,
        None => namespace::register_namespace(&uri, "ns")?,
    };
    Ok(format!("{}{}", prefix, local))
}

fn base_scope() -> HashMap<String, String> {
    let mut scope = HashMap::new();
    scope.insert("xml".to_string(), ns::XML.to_string());
    scope
}

/// Resolve a prefix against the scope stack, innermost first.
fn resolve_prefix(scopes: &[HashMap<String, String>], prefix: &str) -> Option<String> {
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(prefix).cloned())
}

/// Read one start tag: collect declarations into a new scope, resolve the
/// element and attribute names.
fn open_element(
    start: &BytesStart<'_>,
    scopes: &mut Vec<HashMap<String, String>>,
) -> XmpResult<XmlElem> {
    let mut declarations: HashMap<String, String> = HashMap::new();
    let mut raw_attrs: Vec<(String, String)> = Vec::new();

    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| XmpError::bad_xml(format!("malformed attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw_value = String::from_utf8_lossy(attr.value.as_ref()).to_string();
        let value = unescape(&raw_value)
            .map_err(|e| XmpError::bad_xml(format!("bad entity reference: {}", e)))?
            .to_string();

        if key == "xmlns" {
            // A default namespace; stored under the empty prefix.
            declarations.insert(String::new(), effective_ns(&value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            let uri = effective_ns(&value);
            declarations.insert(prefix.to_string(), uri.clone());
            let _ = namespace::register_namespace(&uri, prefix);
        } else {
            raw_attrs.push((key, value));
        }
    }
    scopes.push(declarations);

    let qname = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let (elem_ns, elem_local) = match qname.split_once(':') {
        Some((prefix, local)) => {
            let uri = resolve_prefix(scopes, prefix).ok_or_else(|| {
                XmpError::bad_xml(format!("undeclared namespace prefix '{}'", prefix))
            })?;
            (uri, local.to_string())
        }
        None => (
            resolve_prefix(scopes, "").unwrap_or_default(),
            qname.clone(),
        ),
    };

    let mut attrs = Vec::new();
    for (key, value) in raw_attrs {
        let (attr_ns, attr_local) = match key.split_once(':') {
            Some((prefix, local)) => {
                let uri = resolve_prefix(scopes, prefix).ok_or_else(|| {
                    XmpError::bad_xml(format!("undeclared namespace prefix '{}'", prefix))
                })?;
                (uri, local.to_string())
            }
            // Unprefixed attributes are in no namespace.
            None => (String::new(), key),
        };
        attrs.push(XmlAttr {
            ns: attr_ns,
            local: attr_local,
            value,
        });
    }

    Ok(XmlElem {
        ns: elem_ns,
        local: elem_local,
        attrs,
        children: Vec::new(),
        text: String::new(),
        has_text: false,
    })
}

fn attach(elem: XmlElem, open: &mut [XmlElem], top_level: &mut Vec<XmlElem>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(elem),
        None => top_level.push(elem),
    }
}

/// Locate the RDF root: inside `x:xmpmeta` when present, otherwise a bare
/// `rdf:RDF` (refused when the wrapper is required).
fn find_rdf_root(elems: &[XmlElem], require_xmp_meta: bool) -> Option<&XmlElem> {
    fn scan<'e>(elems: &'e [XmlElem], pred: &dyn Fn(&XmlElem) -> bool) -> Option<&'e XmlElem> {
        for elem in elems {
            if pred(elem) {
                return Some(elem);
            }
            if let Some(found) = scan(&elem.children, pred) {
                return Some(found);
            }
        }
        None
    }

    let is_meta =
        |e: &XmlElem| e.ns == ns::X && (e.local == "xmpmeta" || e.local == "xapmeta");
    let is_rdf = |e: &XmlElem| e.is_rdf("RDF");

    if let Some(meta) = scan(elems, &is_meta) {
        return scan(&meta.children, &is_rdf);
    }
    if require_xmp_meta {
        return None;
    }
    scan(elems, &is_rdf)
}

/// Capture the `<?xpacket begin ...?>` header text, if present.
fn extract_packet_header(xml: &str) -> Option<String> {
    let start = xml.find("<?xpacket")?;
    let end = xml[start..].find("?>")?;
    let header = &xml[start..start + end + 2];
    if header.contains("begin") {
        Some(header.to_string())
    } else {
        None
    }
}

/// Replace C0 control characters other than TAB/LF/CR by spaces.
fn fix_control_chars(xml: &str) -> String {
    xml.chars()
        .map(|c| {
            if c < ' ' && c != '\t' && c != '\n' && c != '\r' {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// With DOCTYPEs enabled, DTD-defined entities are still refused: any
/// non-predefined, non-numeric entity reference is an error.
fn check_entity_references(xml: &str) -> XmpResult<()> {
    let mut pos = 0;
    while let Some(offset) = xml[pos..].find('&') {
        let start = pos + offset + 1;
        let Some(end_offset) = xml[start..].find(';') else {
            break;
        };
        let name = &xml[start..start + end_offset];
        let predefined = matches!(name, "amp" | "lt" | "gt" | "apos" | "quot");
        let numeric = name.starts_with('#');
        if !predefined && !numeric && !name.is_empty() && name.len() < 64 {
            return Err(XmpError::bad_xml(format!(
                "reference to DTD-defined entity '&{};' exceeds the expansion limit",
                name
            )));
        }
        pos = start + end_offset + 1;
    }
    Ok(())
}

/// Decode the input buffer, sniffing the encoding.
fn decode_buffer(buffer: &[u8], accept_latin1: bool) -> XmpResult<String> {
    if buffer.len() >= 4 {
        let head = &buffer[..4];
        if head == [0x00, 0x00, 0xFE, 0xFF]
            || head == [0xFF, 0xFE, 0x00, 0x00]
            || head == [0x00, 0x00, 0x00, 0x3C]
            || head == [0x3C, 0x00, 0x00, 0x00]
        {
            return Err(XmpError::bad_xml("UTF-32 input is not supported".to_string()));
        }
    }
    if buffer.len() >= 3 && buffer[..3] == [0xEF, 0xBB, 0xBF] {
        return decode_utf8(&buffer[3..], accept_latin1);
    }
    if buffer.len() >= 2 {
        match (buffer[0], buffer[1]) {
            (0xFE, 0xFF) => return decode_utf16(&buffer[2..], true),
            (0xFF, 0xFE) => return decode_utf16(&buffer[2..], false),
            (0x00, 0x3C) => return decode_utf16(buffer, true),
            (0x3C, 0x00) => return decode_utf16(buffer, false),
            _ => {}
        }
    }
    decode_utf8(buffer, accept_latin1)
}

fn decode_utf8(buffer: &[u8], accept_latin1: bool) -> XmpResult<String> {
    match std::str::from_utf8(buffer) {
        Ok(text) => Ok(text.to_string()),
        Err(_) if accept_latin1 => Ok(buffer.iter().map(|&b| b as char).collect()),
        Err(e) => Err(XmpError::bad_xml(format!("input is not valid UTF-8: {}", e))),
    }
}

fn decode_utf16(buffer: &[u8], big_endian: bool) -> XmpResult<String> {
    if buffer.len() % 2 != 0 {
        return Err(XmpError::bad_xml(
            "odd byte count in UTF-16 input".to_string(),
        ));
    }
    let units: Vec<u16> = buffer
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units)
        .map_err(|e| XmpError::bad_xml(format!("input is not valid UTF-16: {}", e)))
}
