//! XMP node graph
//!
//! A metadata graph is a tree of [`XmpNode`] values. Every node carries a
//! name, an optional string value, a [`PropertyOptions`] bitset describing
//! its form, an ordered child list, and an ordered qualifier list. Schema
//! nodes sit directly under the root and are named by their namespace URI;
//! array items all use the `[]` sentinel name.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace;
use crate::core::options::PropertyOptions;
use std::fmt::Write as _;

/// Sentinel name shared by all array items.
pub const ARRAY_ITEM_NAME: &str = "[]";

/// Qualified name of the language qualifier.
pub const XML_LANG: &str = "xml:lang";

/// Qualified name of the type qualifier.
pub const RDF_TYPE: &str = "rdf:type";

/// Language tag of the default item in an alt-text array.
pub const X_DEFAULT: &str = "x-default";

/// A node in the XMP metadata tree.
#[derive(Debug, Clone, Default)]
pub struct XmpNode {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) options: PropertyOptions,
    pub(crate) children: Vec<XmpNode>,
    pub(crate) qualifiers: Vec<XmpNode>,
    /// Created as an intermediate container during path resolution; reaped
    /// if left childless.
    pub(crate) implicit: bool,
    /// The subtree contains alias placeholders.
    pub(crate) has_aliases: bool,
    /// This property was created via an alias name.
    pub(crate) is_alias: bool,
    /// An `rdf:value` child fix-up is pending.
    pub(crate) has_value_child: bool,
}

impl XmpNode {
    /// Create a node with a name, value, and options.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        options: PropertyOptions,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
            ..Self::default()
        }
    }

    /// Create the empty tree root.
    pub(crate) fn new_root() -> Self {
        Self::default()
    }

    /// Create a schema node for a namespace URI.
    pub(crate) fn new_schema(uri: impl Into<String>) -> Self {
        let mut node = Self::new(uri, "", PropertyOptions::new().set_schema_node(true));
        node.implicit = true;
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn options(&self) -> PropertyOptions {
        self.options
    }

    /// Replace the node's options after a consistency check.
    pub fn set_options(&mut self, options: PropertyOptions) -> XmpResult<()> {
        options.check_consistency()?;
        self.options = options;
        Ok(())
    }

    pub fn is_array_item(&self) -> bool {
        self.name == ARRAY_ITEM_NAME
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children_len(&self) -> usize {
        self.children.len()
    }

    /// Get a child by 1-based index.
    pub fn child(&self, index: usize) -> Option<&XmpNode> {
        if index == 0 {
            return None;
        }
        self.children.get(index - 1)
    }

    /// Get a mutable child by 1-based index.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut XmpNode> {
        if index == 0 {
            return None;
        }
        self.children.get_mut(index - 1)
    }

    pub fn children(&self) -> impl Iterator<Item = &XmpNode> {
        self.children.iter()
    }

    /// Find a child by name; returns its 1-based index.
    pub fn find_child(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.name == name)
            .map(|i| i + 1)
    }

    /// Append a child, enforcing name uniqueness outside arrays.
    pub fn add_child(&mut self, child: XmpNode) -> XmpResult<()> {
        self.check_child_name(&child)?;
        self.children.push(child);
        Ok(())
    }

    /// Insert a child at a 1-based index, shifting later children right.
    pub fn add_child_at(&mut self, index: usize, child: XmpNode) -> XmpResult<()> {
        if index == 0 || index > self.children.len() + 1 {
            return Err(XmpError::BadParam(format!(
                "child index {} out of bounds for {} children",
                index,
                self.children.len()
            )));
        }
        self.check_child_name(&child)?;
        self.children.insert(index - 1, child);
        Ok(())
    }

    /// Remove and return the child at a 1-based index.
    pub fn remove_child(&mut self, index: usize) -> XmpResult<XmpNode> {
        if index == 0 || index > self.children.len() {
            return Err(XmpError::BadParam(format!(
                "child index {} out of bounds for {} children",
                index,
                self.children.len()
            )));
        }
        Ok(self.children.remove(index - 1))
    }

    /// Remove a child by name; true if one was removed.
    pub fn remove_child_by_name(&mut self, name: &str) -> bool {
        match self.find_child(name) {
            Some(index) => {
                self.children.remove(index - 1);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }

    fn check_child_name(&self, child: &XmpNode) -> XmpResult<()> {
        if child.name != ARRAY_ITEM_NAME && self.find_child(&child.name).is_some() {
            return Err(XmpError::BadXmp(format!(
                "duplicate property or field node '{}'",
                child.name
            )));
        }
        Ok(())
    }

    pub fn has_qualifiers(&self) -> bool {
        !self.qualifiers.is_empty()
    }

    pub fn qualifiers_len(&self) -> usize {
        self.qualifiers.len()
    }

    /// Get a qualifier by 1-based index.
    pub fn qualifier(&self, index: usize) -> Option<&XmpNode> {
        if index == 0 {
            return None;
        }
        self.qualifiers.get(index - 1)
    }

    pub fn qualifiers(&self) -> impl Iterator<Item = &XmpNode> {
        self.qualifiers.iter()
    }

    /// Find a qualifier by qualified name; returns its 1-based index.
    pub fn find_qualifier(&self, name: &str) -> Option<usize> {
        self.qualifiers
            .iter()
            .position(|q| q.name == name)
            .map(|i| i + 1)
    }

    pub(crate) fn find_qualifier_mut(&mut self, name: &str) -> Option<&mut XmpNode> {
        self.qualifiers.iter_mut().find(|q| q.name == name)
    }

    /// The value of the `xml:lang` qualifier, if present.
    pub fn lang(&self) -> Option<&str> {
        self.find_qualifier(XML_LANG)
            .and_then(|i| self.qualifier(i))
            .map(|q| q.value())
    }

    /// Attach a qualifier, keeping `xml:lang` first and `rdf:type` next.
    ///
    /// An existing qualifier of the same name is replaced in place.
    pub fn add_qualifier(&mut self, mut qualifier: XmpNode) -> XmpResult<()> {
        qualifier.options = qualifier.options.set_qualifier(true);

        let is_lang = qualifier.name == XML_LANG;
        let is_type = qualifier.name == RDF_TYPE;

        if let Some(existing) = self.find_qualifier_mut(&qualifier.name) {
            *existing = qualifier;
        } else if is_lang {
            self.qualifiers.insert(0, qualifier);
        } else if is_type {
            let at = usize::from(self.find_qualifier(XML_LANG).is_some());
            self.qualifiers.insert(at, qualifier);
        } else {
            self.qualifiers.push(qualifier);
        }

        self.options = self.options.set_has_qualifiers(true);
        if is_lang {
            self.options = self.options.set_has_lang(true);
        }
        if is_type {
            self.options = self.options.set_has_type(true);
        }
        Ok(())
    }

    /// Remove a qualifier by name; true if one was removed.
    pub fn remove_qualifier(&mut self, name: &str) -> bool {
        let Some(index) = self.find_qualifier(name) else {
            return false;
        };
        self.qualifiers.remove(index - 1);
        if name == XML_LANG {
            self.options = self.options.set_has_lang(false);
        }
        if name == RDF_TYPE {
            self.options = self.options.set_has_type(false);
        }
        if self.qualifiers.is_empty() {
            self.options = self.options.set_has_qualifiers(false);
        }
        true
    }

    /// Remove all qualifiers and clear the derived flags.
    pub fn remove_qualifiers(&mut self) {
        self.qualifiers.clear();
        self.options = self
            .options
            .set_has_qualifiers(false)
            .set_has_lang(false)
            .set_has_type(false);
    }

    pub(crate) fn take_qualifiers(&mut self) -> Vec<XmpNode> {
        let quals = std::mem::take(&mut self.qualifiers);
        self.options = self
            .options
            .set_has_qualifiers(false)
            .set_has_lang(false)
            .set_has_type(false);
        quals
    }

    /// Sort the subtree: named children by name, qualifiers in canonical
    /// order, array items untouched.
    pub fn sort_subtree(&mut self) {
        if !self.options.is_array() {
            self.children.sort_by(|a, b| a.name.cmp(&b.name));
        }
        self.sort_qualifiers();
        for child in &mut self.children {
            child.sort_subtree();
        }
        for qual in &mut self.qualifiers {
            qual.sort_subtree();
        }
    }

    /// Qualifier order: `xml:lang`, `rdf:type`, then the rest by name.
    pub(crate) fn sort_qualifiers(&mut self) {
        self.qualifiers.sort_by(|a, b| {
            let rank = |q: &XmpNode| match q.name.as_str() {
                XML_LANG => 0,
                RDF_TYPE => 1,
                _ => 2,
            };
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Recursive debug rendering of the subtree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        let shown_name: &str = if self.name.is_empty() {
            "(root)"
        } else {
            &self.name
        };
        let _ = write!(out, "{}", shown_name);
        if !self.value.is_empty() {
            let _ = write!(out, " = \"{}\"", self.value);
        }
        let opts = self.options;
        let mut tags: Vec<&str> = Vec::new();
        if opts.is_schema_node() {
            tags.push("schema");
        }
        if opts.is_struct() {
            tags.push("struct");
        }
        if opts.is_array_alt_text() {
            tags.push("alt-text");
        } else if opts.is_array_alternate() {
            tags.push("alt");
        } else if opts.is_array_ordered() {
            tags.push("seq");
        } else if opts.is_array() {
            tags.push("bag");
        }
        if opts.is_uri() {
            tags.push("uri");
        }
        if !tags.is_empty() {
            let _ = write!(out, "  ({})", tags.join(", "));
        }
        out.push('\n');
        for qual in &self.qualifiers {
            for _ in 0..depth + 1 {
                out.push_str("  ");
            }
            let _ = writeln!(out, "? {} = \"{}\"", qual.name, qual.value);
        }
        for child in &self.children {
            child.dump_into(out, depth + 1);
        }
    }

    /// Sort the root level: schema nodes ordered by their registered prefix.
    pub(crate) fn sort_schemas(&mut self) {
        self.children.sort_by_key(|schema| {
            namespace::prefix_for_uri(&schema.name).unwrap_or_else(|| schema.name.clone())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(name: &str, value: &str) -> XmpNode {
        XmpNode::new(name, value, PropertyOptions::new())
    }

    #[test]
    fn test_child_uniqueness() {
        let mut node = XmpNode::new("dc:subject", "", PropertyOptions::new().set_struct(true));
        node.add_child(simple("dc:a", "1")).unwrap();
        assert!(matches!(
            node.add_child(simple("dc:a", "2")),
            Err(XmpError::BadXmp(_))
        ));

        // Array items share the sentinel name.
        let mut array = XmpNode::new("dc:subject", "", PropertyOptions::new().set_array(true));
        array.add_child(simple(ARRAY_ITEM_NAME, "1")).unwrap();
        array.add_child(simple(ARRAY_ITEM_NAME, "2")).unwrap();
        assert_eq!(array.children_len(), 2);
    }

    #[test]
    fn test_one_based_child_access() {
        let mut array = XmpNode::new("a", "", PropertyOptions::new().set_array(true));
        array.add_child(simple(ARRAY_ITEM_NAME, "first")).unwrap();
        array.add_child(simple(ARRAY_ITEM_NAME, "second")).unwrap();

        assert!(array.child(0).is_none());
        assert_eq!(array.child(1).unwrap().value(), "first");
        assert_eq!(array.child(2).unwrap().value(), "second");
        assert!(array.child(3).is_none());

        array
            .add_child_at(2, simple(ARRAY_ITEM_NAME, "middle"))
            .unwrap();
        assert_eq!(array.child(2).unwrap().value(), "middle");

        let removed = array.remove_child(1).unwrap();
        assert_eq!(removed.value(), "first");
        assert_eq!(array.children_len(), 2);
    }

    #[test]
    fn test_qualifier_ordering() {
        let mut node = simple("dc:x", "v");
        node.add_qualifier(simple("ns:other", "o")).unwrap();
        node.add_qualifier(simple(RDF_TYPE, "t")).unwrap();
        node.add_qualifier(simple(XML_LANG, "en")).unwrap();

        assert_eq!(node.qualifier(1).unwrap().name(), XML_LANG);
        assert_eq!(node.qualifier(2).unwrap().name(), RDF_TYPE);
        assert_eq!(node.qualifier(3).unwrap().name(), "ns:other");
        assert!(node.options().has_qualifiers());
        assert!(node.options().has_lang());
        assert!(node.options().has_type());
    }

    #[test]
    fn test_qualifier_replacement() {
        let mut node = simple("dc:x", "v");
        node.add_qualifier(simple(XML_LANG, "en")).unwrap();
        node.add_qualifier(simple(XML_LANG, "de")).unwrap();
        assert_eq!(node.qualifiers_len(), 1);
        assert_eq!(node.lang(), Some("de"));
    }

    #[test]
    fn test_qualifier_flags_cleared_on_removal() {
        let mut node = simple("dc:x", "v");
        node.add_qualifier(simple(XML_LANG, "en")).unwrap();
        node.add_qualifier(simple("ns:q", "1")).unwrap();

        assert!(node.remove_qualifier(XML_LANG));
        assert!(!node.options().has_lang());
        assert!(node.options().has_qualifiers());

        assert!(node.remove_qualifier("ns:q"));
        assert!(!node.options().has_qualifiers());
    }

    #[test]
    fn test_sort_subtree() {
        let mut node = XmpNode::new("s", "", PropertyOptions::new().set_struct(true));
        node.add_child(simple("ns:b", "2")).unwrap();
        node.add_child(simple("ns:a", "1")).unwrap();
        node.sort_subtree();
        assert_eq!(node.child(1).unwrap().name(), "ns:a");

        // Array order must survive a sort.
        let mut array = XmpNode::new("a", "", PropertyOptions::new().set_array_ordered(true));
        array.add_child(simple(ARRAY_ITEM_NAME, "z")).unwrap();
        array.add_child(simple(ARRAY_ITEM_NAME, "a")).unwrap();
        array.sort_subtree();
        assert_eq!(array.child(1).unwrap().value(), "z");
    }

    #[test]
    fn test_dump_contains_names_and_values() {
        let mut node = simple("dc:format", "image/jpeg");
        node.add_qualifier(simple(XML_LANG, "en")).unwrap();
        let dump = node.dump();
        assert!(dump.contains("dc:format"));
        assert!(dump.contains("image/jpeg"));
        assert!(dump.contains("xml:lang"));
    }
}
