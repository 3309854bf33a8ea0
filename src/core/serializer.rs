//! XMP RDF/XML serializer
//!
//! Emits the node graph as RDF/XML, one `rdf:Description` block per schema,
//! wrapped in `x:xmpmeta` and the `<?xpacket?>` envelope unless the options
//! say otherwise. Emission is built directly into a string because padding,
//! newline, and indentation control must be byte-exact for embedding.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace;
use crate::core::node::{XmpNode, XML_LANG};
use crate::core::options::{SerializeOptions, XmpEncoding};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// The fixed packet id GUID.
pub const XPACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Serialize to bytes in the encoding the options request.
pub(crate) fn serialize(
    root: &XmpNode,
    object_name: &str,
    options: &SerializeOptions,
) -> XmpResult<Vec<u8>> {
    let packet = build_packet(root, object_name, options)?;
    Ok(match options.encoding {
        XmpEncoding::Utf8 => packet.into_bytes(),
        XmpEncoding::Utf16Be => packet
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect(),
        XmpEncoding::Utf16Le => packet
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect(),
    })
}

/// Serialize to a string; requires the UTF-8 encoding.
pub(crate) fn serialize_to_string(
    root: &XmpNode,
    object_name: &str,
    options: &SerializeOptions,
) -> XmpResult<String> {
    if options.encoding != XmpEncoding::Utf8 {
        return Err(XmpError::BadOptions(
            "string serialization requires UTF-8".to_string(),
        ));
    }
    build_packet(root, object_name, options)
}

fn build_packet(
    root: &XmpNode,
    object_name: &str,
    options: &SerializeOptions,
) -> XmpResult<String> {
    options.verify()?;

    let sorted_root;
    let root = if options.sort {
        let mut clone = root.clone();
        clone.sort_schemas();
        for schema in &mut clone.children {
            schema.sort_subtree();
        }
        sorted_root = clone;
        &sorted_root
    } else {
        root
    };

    let mut emitter = Emitter {
        out: String::new(),
        options,
    };

    if !options.omit_packet_wrapper {
        let _ = write!(
            emitter.out,
            "<?xpacket begin=\"\u{FEFF}\" id=\"{}\"?>",
            XPACKET_ID
        );
        emitter.out.push_str(&options.newline);
    }

    let mut level = 0;
    if !options.omit_xmp_meta_element {
        emitter.line(level, "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">");
        level += 1;
    }
    emitter.line(level, &format!("<rdf:RDF xmlns:rdf=\"{}\">", RDF_NS));
    level += 1;

    if root.has_children() {
        for schema in root.children() {
            emitter.emit_schema(schema, object_name, level)?;
        }
    } else {
        let mut line = String::from("<rdf:Description rdf:about=\"");
        escape_attr(&mut line, object_name);
        line.push_str("\"/>");
        emitter.line(level, &line);
    }

    level -= 1;
    emitter.line(level, "</rdf:RDF>");
    if !options.omit_xmp_meta_element {
        emitter.line(level.saturating_sub(1), "</x:xmpmeta>");
    }

    if options.omit_packet_wrapper {
        return Ok(emitter.out);
    }

    let trailer = format!(
        "<?xpacket end=\"{}\"?>",
        if options.read_only_packet { "r" } else { "w" }
    );

    let unit = options.encoding.unit_size();
    let pad_units = padding_units(&emitter.out, &trailer, options, unit)?;

    // Padding is plain spaces broken by bare newlines; both are one code
    // unit, keeping the byte arithmetic exact in every encoding.
    let mut out = emitter.out;
    for i in 0..pad_units {
        if (i + 1) % 100 == 0 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out.push_str(&trailer);
    Ok(out)
}

/// Compute how many padding characters to insert before the trailer.
fn padding_units(
    body: &str,
    trailer: &str,
    options: &SerializeOptions,
    unit: usize,
) -> XmpResult<usize> {
    let count_units = |s: &str| -> usize {
        match unit {
            1 => s.len(),
            _ => s.encode_utf16().count(),
        }
    };
    let current_bytes = (count_units(body) + count_units(trailer)) * unit;

    if options.exact_packet_length {
        let target = options.padding;
        if target < current_bytes {
            return Err(XmpError::BadSerialize(format!(
                "packet of {} bytes exceeds the requested length of {} bytes",
                current_bytes, target
            )));
        }
        let pad_bytes = target - current_bytes;
        if pad_bytes % unit != 0 {
            return Err(XmpError::BadSerialize(
                "exact packet length is not a multiple of the character size".to_string(),
            ));
        }
        return Ok(pad_bytes / unit);
    }
    if options.read_only_packet {
        return Ok(0);
    }
    let pad_bytes = if options.padding == 0 {
        2048 * unit
    } else {
        options.padding
    };
    Ok(pad_bytes / unit)
}

struct Emitter<'a> {
    out: String,
    options: &'a SerializeOptions,
}

impl Emitter<'_> {
    fn line(&mut self, level: usize, content: &str) {
        self.indent(level);
        self.out.push_str(content);
        self.out.push_str(&self.options.newline);
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..self.options.base_indent + level {
            self.out.push_str(&self.options.indent);
        }
    }

    fn emit_schema(
        &mut self,
        schema: &XmpNode,
        object_name: &str,
        level: usize,
    ) -> XmpResult<()> {
        let declarations = collect_declarations(schema);

        let compact = self.options.use_compact_format;
        let (attr_props, elem_props): (Vec<&XmpNode>, Vec<&XmpNode>) = schema
            .children()
            .partition(|p| compact && is_attr_eligible(p));

        self.indent(level);
        self.out.push_str("<rdf:Description rdf:about=\"");
        escape_attr(&mut self.out, object_name);
        self.out.push('"');

        for (prefix, uri) in &declarations {
            self.out.push_str(&self.options.newline);
            self.indent(level + 2);
            let _ = write!(self.out, "xmlns:{}=\"", prefix.trim_end_matches(':'));
            escape_attr(&mut self.out, uri);
            self.out.push('"');
        }
        for prop in &attr_props {
            self.out.push_str(&self.options.newline);
            self.indent(level + 2);
            let _ = write!(self.out, "{}=\"", prop.name());
            escape_attr(&mut self.out, prop.value());
            self.out.push('"');
        }

        if elem_props.is_empty() {
            self.out.push_str("/>");
            self.out.push_str(&self.options.newline);
            return Ok(());
        }

        self.out.push('>');
        self.out.push_str(&self.options.newline);
        for prop in &elem_props {
            self.emit_property(prop, level + 1)?;
        }
        self.line(level, "</rdf:Description>");
        Ok(())
    }

    fn emit_property(&mut self, node: &XmpNode, level: usize) -> XmpResult<()> {
        let name = if node.is_array_item() {
            "rdf:li"
        } else {
            node.name()
        };
        if name.is_empty() {
            return Err(XmpError::BadSerialize(
                "cannot serialize a node without a name".to_string(),
            ));
        }

        self.indent(level);
        self.out.push('<');
        self.out.push_str(name);
        if let Some(lang) = node.lang() {
            self.out.push_str(" xml:lang=\"");
            escape_attr(&mut self.out, lang);
            self.out.push('"');
        }

        let general_quals: Vec<&XmpNode> =
            node.qualifiers().filter(|q| q.name() != XML_LANG).collect();

        if !general_quals.is_empty() {
            // Qualified value: rdf:value first, the qualifiers as siblings.
            self.out.push_str(" rdf:parseType=\"Resource\">");
            self.out.push_str(&self.options.newline);
            self.emit_value_element(node, level + 1)?;
            for qual in general_quals {
                self.emit_property(qual, level + 1)?;
            }
            self.close_element(name, level);
        } else if node.options().is_array() {
            let container = if node.options().is_array_alternate() {
                "rdf:Alt"
            } else if node.options().is_array_ordered() {
                "rdf:Seq"
            } else {
                "rdf:Bag"
            };
            self.out.push('>');
            self.out.push_str(&self.options.newline);
            if node.has_children() {
                self.line(level + 1, &format!("<{}>", container));
                for item in node.children() {
                    self.emit_property(item, level + 2)?;
                }
                self.line(level + 1, &format!("</{}>", container));
            } else {
                self.line(level + 1, &format!("<{}/>", container));
            }
            self.close_element(name, level);
        } else if node.options().is_struct() {
            if !node.has_children() {
                self.out.push_str(" rdf:parseType=\"Resource\"/>");
                self.out.push_str(&self.options.newline);
            } else if self.options.use_compact_format
                && node.children().all(is_attr_eligible)
            {
                // All-simple structs shrink to attributes.
                for field in node.children() {
                    self.out.push(' ');
                    self.out.push_str(field.name());
                    self.out.push_str("=\"");
                    escape_attr(&mut self.out, field.value());
                    self.out.push('"');
                }
                self.out.push_str("/>");
                self.out.push_str(&self.options.newline);
            } else {
                self.out.push_str(" rdf:parseType=\"Resource\">");
                self.out.push_str(&self.options.newline);
                for field in node.children() {
                    self.emit_property(field, level + 1)?;
                }
                self.close_element(name, level);
            }
        } else if node.options().is_uri() {
            self.out.push_str(" rdf:resource=\"");
            escape_attr(&mut self.out, node.value());
            self.out.push_str("\"/>");
            self.out.push_str(&self.options.newline);
        } else if node.value().is_empty() {
            self.out.push_str("/>");
            self.out.push_str(&self.options.newline);
        } else {
            self.out.push('>');
            escape_text(&mut self.out, node.value());
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push('>');
            self.out.push_str(&self.options.newline);
        }
        Ok(())
    }

    /// The `rdf:value` element of a qualified property.
    fn emit_value_element(&mut self, node: &XmpNode, level: usize) -> XmpResult<()> {
        if node.options().is_composite() {
            // A composite value keeps its shape inside rdf:value.
            let mut shell = node.clone();
            shell.set_name("rdf:value");
            shell.remove_qualifiers();
            return self.emit_property(&shell, level);
        }
        self.indent(level);
        if node.options().is_uri() {
            self.out.push_str("<rdf:value rdf:resource=\"");
            escape_attr(&mut self.out, node.value());
            self.out.push_str("\"/>");
        } else {
            self.out.push_str("<rdf:value>");
            escape_text(&mut self.out, node.value());
            self.out.push_str("</rdf:value>");
        }
        self.out.push_str(&self.options.newline);
        Ok(())
    }

    fn close_element(&mut self, name: &str, level: usize) {
        self.indent(level);
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        self.out.push_str(&self.options.newline);
    }
}

/// A property fits into an attribute when it is simple, unqualified, and not
/// a URI.
fn is_attr_eligible(node: &XmpNode) -> bool {
    node.options().is_simple() && !node.options().has_qualifiers() && !node.options().is_uri()
}

/// Collect the namespace declarations a schema block needs, keyed by prefix.
fn collect_declarations(schema: &XmpNode) -> BTreeMap<String, String> {
    let mut prefixes = BTreeMap::new();
    if let Some(prefix) = namespace::prefix_for_uri(schema.name()) {
        prefixes.insert(prefix, schema.name().to_string());
    }
    for child in schema.children() {
        collect_node_prefixes(child, &mut prefixes);
    }
    prefixes
}

fn collect_node_prefixes(node: &XmpNode, prefixes: &mut BTreeMap<String, String>) {
    if let Some((prefix, _)) = node.name().split_once(':') {
        if prefix != "xml" && prefix != "rdf" {
            let key = format!("{}:", prefix);
            if !prefixes.contains_key(&key) {
                if let Some(uri) = namespace::uri_for_prefix(prefix) {
                    prefixes.insert(key, uri);
                }
            }
        }
    }
    for qual in node.qualifiers() {
        collect_node_prefixes(qual, prefixes);
    }
    for child in node.children() {
        collect_node_prefixes(child, prefixes);
    }
}

/// Escape text content: `<`, `>`, `&` always; other C0 controls as numeric
/// character references.
fn escape_text(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Escape attribute values: text rules plus quotes, and whitespace kept as
/// character references so it survives attribute-value normalization.
fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c if c < ' ' => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
}
