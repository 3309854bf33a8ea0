//! Option sets for properties, parsing, serialization, and iteration
//!
//! Property form is tracked as a compact bitset on every node; the remaining
//! categories are plain builder structs. Invalid combinations are reported as
//! `BadOptions`.

use crate::core::error::{XmpError, XmpResult};

/// Form and state flags of a single property node.
///
/// The flag values match the classic toolkit constants so that embedders can
/// pass them through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyOptions(u32);

impl PropertyOptions {
    /// The value is a URI, serialized as `rdf:resource`.
    pub const VALUE_IS_URI: u32 = 0x0000_0002;
    /// The node has qualifiers.
    pub const HAS_QUALIFIERS: u32 = 0x0000_0010;
    /// The node is itself a qualifier.
    pub const IS_QUALIFIER: u32 = 0x0000_0020;
    /// The node has an `xml:lang` qualifier.
    pub const HAS_LANG: u32 = 0x0000_0040;
    /// The node has an `rdf:type` qualifier.
    pub const HAS_TYPE: u32 = 0x0000_0080;
    /// The node is a struct with named fields.
    pub const VALUE_IS_STRUCT: u32 = 0x0000_0100;
    /// The node is an array (`rdf:Bag` unless ordered).
    pub const VALUE_IS_ARRAY: u32 = 0x0000_0200;
    /// Array item order matters (`rdf:Seq`).
    pub const ARRAY_IS_ORDERED: u32 = 0x0000_0400;
    /// Array items are alternates (`rdf:Alt`).
    pub const ARRAY_IS_ALTERNATE: u32 = 0x0000_0800;
    /// Alternate array items are language variants.
    pub const ARRAY_IS_ALT_TEXT: u32 = 0x0000_1000;
    /// The node is a schema node, holding one namespace's properties.
    pub const IS_SCHEMA_NODE: u32 = 0x8000_0000;

    const COMPOSITE_MASK: u32 = Self::VALUE_IS_STRUCT | Self::VALUE_IS_ARRAY;
    const ARRAY_FORM_MASK: u32 = Self::VALUE_IS_ARRAY
        | Self::ARRAY_IS_ORDERED
        | Self::ARRAY_IS_ALTERNATE
        | Self::ARRAY_IS_ALT_TEXT;

    /// Create an empty option set (a simple external property).
    pub fn new() -> Self {
        Self(0)
    }

    /// Create an option set from raw flag bits.
    pub fn from_bits(bits: u32) -> XmpResult<Self> {
        let opts = Self(bits);
        opts.check_consistency()?;
        Ok(opts)
    }

    /// The raw flag bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_simple(&self) -> bool {
        self.0 & Self::COMPOSITE_MASK == 0
    }

    pub fn is_composite(&self) -> bool {
        !self.is_simple()
    }

    pub fn is_uri(&self) -> bool {
        self.0 & Self::VALUE_IS_URI != 0
    }

    pub fn set_uri(mut self, value: bool) -> Self {
        self.assign(Self::VALUE_IS_URI, value);
        self
    }

    pub fn has_qualifiers(&self) -> bool {
        self.0 & Self::HAS_QUALIFIERS != 0
    }

    pub fn set_has_qualifiers(mut self, value: bool) -> Self {
        self.assign(Self::HAS_QUALIFIERS, value);
        self
    }

    pub fn is_qualifier(&self) -> bool {
        self.0 & Self::IS_QUALIFIER != 0
    }

    pub fn set_qualifier(mut self, value: bool) -> Self {
        self.assign(Self::IS_QUALIFIER, value);
        self
    }

    pub fn has_lang(&self) -> bool {
        self.0 & Self::HAS_LANG != 0
    }

    pub fn set_has_lang(mut self, value: bool) -> Self {
        self.assign(Self::HAS_LANG, value);
        self
    }

    pub fn has_type(&self) -> bool {
        self.0 & Self::HAS_TYPE != 0
    }

    pub fn set_has_type(mut self, value: bool) -> Self {
        self.assign(Self::HAS_TYPE, value);
        self
    }

    pub fn is_struct(&self) -> bool {
        self.0 & Self::VALUE_IS_STRUCT != 0
    }

    pub fn set_struct(mut self, value: bool) -> Self {
        self.assign(Self::VALUE_IS_STRUCT, value);
        self
    }

    pub fn is_array(&self) -> bool {
        self.0 & Self::VALUE_IS_ARRAY != 0
    }

    pub fn set_array(mut self, value: bool) -> Self {
        self.assign(Self::VALUE_IS_ARRAY, value);
        self
    }

    pub fn is_array_ordered(&self) -> bool {
        self.0 & Self::ARRAY_IS_ORDERED != 0
    }

    /// Mark the array ordered. Implies the array flag.
    pub fn set_array_ordered(mut self, value: bool) -> Self {
        self.assign(Self::ARRAY_IS_ORDERED, value);
        if value {
            self.0 |= Self::VALUE_IS_ARRAY;
        }
        self
    }

    pub fn is_array_alternate(&self) -> bool {
        self.0 & Self::ARRAY_IS_ALTERNATE != 0
    }

    /// Mark the array as alternates. Implies ordered and array.
    pub fn set_array_alternate(mut self, value: bool) -> Self {
        self.assign(Self::ARRAY_IS_ALTERNATE, value);
        if value {
            self.0 |= Self::VALUE_IS_ARRAY | Self::ARRAY_IS_ORDERED;
        }
        self
    }

    pub fn is_array_alt_text(&self) -> bool {
        self.0 & Self::ARRAY_IS_ALT_TEXT != 0
    }

    /// Mark the array as language alternatives. Implies alternate, ordered,
    /// and array.
    pub fn set_array_alt_text(mut self, value: bool) -> Self {
        self.assign(Self::ARRAY_IS_ALT_TEXT, value);
        if value {
            self.0 |= Self::VALUE_IS_ARRAY | Self::ARRAY_IS_ORDERED | Self::ARRAY_IS_ALTERNATE;
        }
        self
    }

    pub fn is_schema_node(&self) -> bool {
        self.0 & Self::IS_SCHEMA_NODE != 0
    }

    pub fn set_schema_node(mut self, value: bool) -> Self {
        self.assign(Self::IS_SCHEMA_NODE, value);
        self
    }

    /// True when only array-form flags are set.
    pub fn is_only_array_options(&self) -> bool {
        self.0 & !Self::ARRAY_FORM_MASK == 0
    }

    /// Check cross-flag consistency.
    pub fn check_consistency(&self) -> XmpResult<()> {
        if self.is_struct() && self.is_array() {
            return Err(XmpError::BadOptions(
                "a property cannot be both a struct and an array".to_string(),
            ));
        }
        if self.is_uri() && self.is_composite() {
            return Err(XmpError::BadOptions(
                "structs and arrays cannot have URI values".to_string(),
            ));
        }
        if self.is_array_alt_text() && !self.is_array_alternate() {
            return Err(XmpError::BadOptions(
                "alt-text arrays must be alternate arrays".to_string(),
            ));
        }
        if self.is_array_alternate() && !self.is_array_ordered() {
            return Err(XmpError::BadOptions(
                "alternate arrays must be ordered arrays".to_string(),
            ));
        }
        if (self.is_array_ordered() || self.is_array_alternate() || self.is_array_alt_text())
            && !self.is_array()
        {
            return Err(XmpError::BadOptions(
                "array form flags require the array flag".to_string(),
            ));
        }
        if self.is_qualifier() && self.is_schema_node() {
            return Err(XmpError::BadOptions(
                "a qualifier cannot be a schema node".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn assign(&mut self, flag: u32, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub(crate) fn clear_array_form(&mut self) {
        self.0 &= !Self::ARRAY_FORM_MASK;
    }
}

/// Output encoding of a serialized packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XmpEncoding {
    /// UTF-8 (default)
    #[default]
    Utf8,
    /// UTF-16 big-endian
    Utf16Be,
    /// UTF-16 little-endian
    Utf16Le,
}

impl XmpEncoding {
    /// Bytes per code unit for padding arithmetic.
    pub(crate) fn unit_size(&self) -> usize {
        match self {
            XmpEncoding::Utf8 => 1,
            XmpEncoding::Utf16Be | XmpEncoding::Utf16Le => 2,
        }
    }
}

/// Options controlling the RDF parser.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Require the outer `x:xmpmeta` element to be present.
    pub require_xmp_meta: bool,
    /// Report alias/actual conflicts instead of reconciling them.
    pub strict_aliasing: bool,
    /// Replace stray C0 control characters by spaces before parsing.
    pub fix_control_chars: bool,
    /// Retry a failed UTF-8 decode as Latin-1.
    pub accept_latin1: bool,
    /// Skip the normalization pass after raw parsing.
    pub omit_normalization: bool,
    /// Accept DOCTYPE declarations. Off by default; even when enabled,
    /// DTD-defined entities are never expanded and any reference to one is a
    /// `BadXml` error.
    pub allow_doctype: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            require_xmp_meta: false,
            strict_aliasing: false,
            fix_control_chars: false,
            accept_latin1: false,
            omit_normalization: false,
            allow_doctype: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_xmp_meta(mut self, value: bool) -> Self {
        self.require_xmp_meta = value;
        self
    }

    pub fn strict_aliasing(mut self, value: bool) -> Self {
        self.strict_aliasing = value;
        self
    }

    pub fn fix_control_chars(mut self, value: bool) -> Self {
        self.fix_control_chars = value;
        self
    }

    pub fn accept_latin1(mut self, value: bool) -> Self {
        self.accept_latin1 = value;
        self
    }

    pub fn omit_normalization(mut self, value: bool) -> Self {
        self.omit_normalization = value;
        self
    }

    pub fn allow_doctype(mut self, value: bool) -> Self {
        self.allow_doctype = value;
        self
    }
}

/// Options controlling serialization.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Write simple unqualified properties as attributes where possible.
    pub use_compact_format: bool,
    /// Omit the `<?xpacket?>` header and trailer and all padding.
    pub omit_packet_wrapper: bool,
    /// Omit the `x:xmpmeta` element.
    pub omit_xmp_meta_element: bool,
    /// Mark the packet read-only (`end="r"`); the packet gets no padding.
    pub read_only_packet: bool,
    /// Interpret `padding` as the total packet size instead of a pad count.
    pub exact_packet_length: bool,
    /// Padding byte count; 0 selects the library default of 2048 bytes.
    pub padding: usize,
    /// Indentation unit.
    pub indent: String,
    /// Number of indentation units applied to the whole packet.
    pub base_indent: usize,
    /// Newline sequence.
    pub newline: String,
    /// Sort the graph before emission.
    pub sort: bool,
    /// Output encoding.
    pub encoding: XmpEncoding,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            use_compact_format: false,
            omit_packet_wrapper: false,
            omit_xmp_meta_element: false,
            read_only_packet: false,
            exact_packet_length: false,
            padding: 0,
            indent: "  ".to_string(),
            base_indent: 0,
            newline: "\n".to_string(),
            sort: false,
            encoding: XmpEncoding::Utf8,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_compact_format(mut self, value: bool) -> Self {
        self.use_compact_format = value;
        self
    }

    pub fn omit_packet_wrapper(mut self, value: bool) -> Self {
        self.omit_packet_wrapper = value;
        self
    }

    pub fn omit_xmp_meta_element(mut self, value: bool) -> Self {
        self.omit_xmp_meta_element = value;
        self
    }

    pub fn read_only_packet(mut self, value: bool) -> Self {
        self.read_only_packet = value;
        self
    }

    pub fn exact_packet_length(mut self, value: bool) -> Self {
        self.exact_packet_length = value;
        self
    }

    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn base_indent(mut self, levels: usize) -> Self {
        self.base_indent = levels;
        self
    }

    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    pub fn sort(mut self, value: bool) -> Self {
        self.sort = value;
        self
    }

    pub fn encoding(mut self, encoding: XmpEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Reject inconsistent combinations before serialization starts.
    pub(crate) fn verify(&self) -> XmpResult<()> {
        if self.read_only_packet && self.padding > 0 && !self.exact_packet_length {
            return Err(XmpError::BadOptions(
                "read-only packets cannot carry padding".to_string(),
            ));
        }
        if self.exact_packet_length && self.omit_packet_wrapper {
            return Err(XmpError::BadOptions(
                "exact packet length requires the packet wrapper".to_string(),
            ));
        }
        if self.omit_packet_wrapper && self.padding > 0 {
            return Err(XmpError::BadOptions(
                "padding requires the packet wrapper".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options controlling iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterOptions {
    /// Visit only the immediate children of the start node.
    pub just_children: bool,
    /// Visit only leaf nodes.
    pub just_leaf_nodes: bool,
    /// Report leaf names instead of full paths.
    pub just_leaf_name: bool,
    /// Do not descend into qualifiers.
    pub omit_qualifiers: bool,
}

impl IterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn just_children(mut self, value: bool) -> Self {
        self.just_children = value;
        self
    }

    pub fn just_leaf_nodes(mut self, value: bool) -> Self {
        self.just_leaf_nodes = value;
        self
    }

    pub fn just_leaf_name(mut self, value: bool) -> Self {
        self.just_leaf_name = value;
        self
    }

    pub fn omit_qualifiers(mut self, value: bool) -> Self {
        self.omit_qualifiers = value;
        self
    }
}

/// Placement of an alias relative to its actual property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasForm {
    /// Direct mapping onto the actual property.
    Simple,
    /// Mapping onto the first item of an ordered array.
    ArrayItem,
    /// Mapping onto the `x-default` item of an alt-text array.
    AltTextItem,
}

impl AliasForm {
    pub fn is_simple(&self) -> bool {
        matches!(self, AliasForm::Simple)
    }

    pub fn is_array_item(&self) -> bool {
        !self.is_simple()
    }
}
