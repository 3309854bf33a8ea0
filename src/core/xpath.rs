//! XPath-like property paths for XMP
//!
//! A path addresses one node in the metadata tree. The textual forms are:
//!
//! - `prop` for a top-level property
//! - `prop/ns:field` for a struct field
//! - `prop[3]` and `prop[last()]` for array items
//! - `prop/?ns:qual` (or `prop/@ns:qual`) for a qualifier
//! - `prop[ns:field="value"]` for a struct-in-array selected by field value
//! - `prop[?ns:qual="value"]` for an item selected by qualifier value
//!
//! Parsing expands a source string into an [`XmpPath`] whose first step names
//! the schema namespace; composing goes the other way and round-trips.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{self, is_ncname};
use std::fmt;

/// One step of an expanded path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmpPathStep {
    /// Synthetic first step carrying the schema namespace URI.
    Schema(String),
    /// A named child, stored as `prefix:local`.
    StructField(String),
    /// A qualifier, stored as `prefix:local` without the leading `?`.
    Qualifier(String),
    /// A 1-based array index.
    ArrayIndex(usize),
    /// The last existing array item, `[last()]`.
    ArrayLast,
    /// A struct-in-array selector `[prefix:local="value"]`.
    FieldSelector { field: String, value: String },
    /// An item selector `[?prefix:local="value"]`.
    QualSelector { qualifier: String, value: String },
}

/// An expanded property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPath {
    steps: Vec<XmpPathStep>,
}

impl XmpPath {
    pub fn steps(&self) -> &[XmpPathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The schema namespace URI of the first step.
    pub fn schema_ns(&self) -> &str {
        match &self.steps[0] {
            XmpPathStep::Schema(uri) => uri,
            _ => "",
        }
    }

    /// The qualified name of the root property.
    pub fn root_name(&self) -> &str {
        match &self.steps[1] {
            XmpPathStep::StructField(name) => name,
            _ => "",
        }
    }

    /// Drop the final step; used to step back from an alias-expanded array
    /// item to the array itself.
    pub(crate) fn pop(&mut self) -> Option<XmpPathStep> {
        self.steps.pop()
    }
}

impl fmt::Display for XmpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first_name = true;
        for step in &self.steps {
            match step {
                XmpPathStep::Schema(_) => {}
                XmpPathStep::StructField(name) => {
                    if !first_name {
                        f.write_str("/")?;
                    }
                    f.write_str(name)?;
                    first_name = false;
                }
                XmpPathStep::Qualifier(name) => {
                    write!(f, "/?{}", name)?;
                    first_name = false;
                }
                XmpPathStep::ArrayIndex(i) => write!(f, "[{}]", i)?,
                XmpPathStep::ArrayLast => f.write_str("[last()]")?,
                XmpPathStep::FieldSelector { field, value } => {
                    write!(f, "[{}=\"{}\"]", field, escape_quotes(value))?
                }
                XmpPathStep::QualSelector { qualifier, value } => {
                    write!(f, "[?{}=\"{}\"]", qualifier, escape_quotes(value))?
                }
            }
        }
        Ok(())
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\"\"")
}

/// Expand a property path against a schema namespace.
///
/// The result starts with a synthetic schema step, followed by the root
/// property (qualified with the registered prefix), followed by the remaining
/// steps. A root property that is a registered alias is rewritten onto the
/// actual property, inserting the array-item step its form requires.
pub fn expand_xpath(schema_ns: &str, path: &str) -> XmpResult<XmpPath> {
    if schema_ns.is_empty() {
        return Err(XmpError::BadSchema("empty schema namespace".to_string()));
    }
    if path.is_empty() {
        return Err(XmpError::BadXPath("empty property path".to_string()));
    }

    let schema_prefix = namespace::prefix_for_uri(schema_ns)
        .ok_or_else(|| XmpError::BadSchema(format!("unregistered namespace '{}'", schema_ns)))?;

    let mut scanner = Scanner::new(path);
    let root_token = scanner.read_name_token()?;

    let root_name = match root_token.split_once(':') {
        Some((prefix, local)) => {
            verify_qname(prefix, local)?;
            let prefix_uri = namespace::uri_for_prefix(prefix)
                .ok_or_else(|| XmpError::BadSchema(format!("unknown prefix '{}:'", prefix)))?;
            if prefix_uri != schema_ns {
                return Err(XmpError::BadSchema(format!(
                    "prefix '{}:' does not match the schema namespace '{}'",
                    prefix, schema_ns
                )));
            }
            root_token.clone()
        }
        None => {
            if !is_ncname(&root_token) {
                return Err(XmpError::BadXPath(format!(
                    "'{}' is not a legal property name",
                    root_token
                )));
            }
            format!("{}{}", schema_prefix, root_token)
        }
    };

    let mut steps = vec![
        XmpPathStep::Schema(schema_ns.to_string()),
        XmpPathStep::StructField(root_name.clone()),
    ];

    // Alias rewrite: replace the root with the actual property and insert
    // the array-item step where the alias form requires one.
    if let Some(info) = namespace::find_alias(&root_name) {
        steps[0] = XmpPathStep::Schema(info.namespace.clone());
        steps[1] = XmpPathStep::StructField(info.qualified_name());
        match info.form {
            crate::core::options::AliasForm::Simple => {}
            crate::core::options::AliasForm::ArrayItem => {
                steps.push(XmpPathStep::ArrayIndex(1));
            }
            crate::core::options::AliasForm::AltTextItem => {
                steps.push(XmpPathStep::QualSelector {
                    qualifier: crate::core::node::XML_LANG.to_string(),
                    value: crate::core::node::X_DEFAULT.to_string(),
                });
            }
        }
    }

    while let Some(step) = scanner.read_step()? {
        steps.push(step);
    }

    Ok(XmpPath { steps })
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
        }
    }

    /// Read a name token, stopping before `/` or `[`.
    fn read_name_token(&mut self) -> XmpResult<String> {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '/' || c == '[' {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        if token.is_empty() {
            return Err(XmpError::BadXPath("empty name in property path".to_string()));
        }
        Ok(token)
    }

    /// Read the next step, or `None` at the end of input.
    fn read_step(&mut self) -> XmpResult<Option<XmpPathStep>> {
        match self.chars.peek() {
            None => Ok(None),
            Some('/') => {
                self.chars.next();
                match self.chars.peek() {
                    Some('?') | Some('@') => {
                        self.chars.next();
                        let name = self.read_name_token()?;
                        verify_qualified(&name)?;
                        Ok(Some(XmpPathStep::Qualifier(name)))
                    }
                    _ => {
                        let name = self.read_name_token()?;
                        verify_qualified(&name)?;
                        Ok(Some(XmpPathStep::StructField(name)))
                    }
                }
            }
            Some('[') => {
                self.chars.next();
                self.read_index_step().map(Some)
            }
            Some(c) => Err(XmpError::BadXPath(format!(
                "unexpected character '{}' in property path",
                c
            ))),
        }
    }

    /// Read the inside of `[...]`, consuming the closing bracket.
    fn read_index_step(&mut self) -> XmpResult<XmpPathStep> {
        match self.chars.peek() {
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&c) = self.chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    digits.push(c);
                    self.chars.next();
                }
                self.expect(']')?;
                let index: usize = digits
                    .parse()
                    .map_err(|_| XmpError::BadXPath(format!("bad array index '{}'", digits)))?;
                if index == 0 {
                    // [0] is the last-item sentinel.
                    Ok(XmpPathStep::ArrayLast)
                } else {
                    Ok(XmpPathStep::ArrayIndex(index))
                }
            }
            Some('?') => {
                self.chars.next();
                let name = self.read_selector_name()?;
                verify_qualified(&name)?;
                let value = self.read_quoted_value()?;
                self.expect(']')?;
                Ok(XmpPathStep::QualSelector {
                    qualifier: name,
                    value,
                })
            }
            Some(_) => {
                let name = self.read_selector_name()?;
                if name == "last()" {
                    self.expect(']')?;
                    return Ok(XmpPathStep::ArrayLast);
                }
                verify_qualified(&name)?;
                let value = self.read_quoted_value()?;
                self.expect(']')?;
                Ok(XmpPathStep::FieldSelector { field: name, value })
            }
            None => Err(XmpError::BadXPath("unclosed '[' in property path".to_string())),
        }
    }

    /// Read a selector name, stopping before `=` or `]`.
    fn read_selector_name(&mut self) -> XmpResult<String> {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '=' || c == ']' {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        if token.is_empty() {
            return Err(XmpError::BadXPath("empty selector name".to_string()));
        }
        Ok(token)
    }

    /// Read `="value"` with either quote kind; a doubled quote escapes one.
    fn read_quoted_value(&mut self) -> XmpResult<String> {
        self.expect('=')?;
        let quote = match self.chars.next() {
            Some(c @ ('"' | '\'')) => c,
            _ => {
                return Err(XmpError::BadXPath(
                    "selector value must be quoted".to_string(),
                ))
            }
        };
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => {
                    if self.chars.peek() == Some(&quote) {
                        self.chars.next();
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return Err(XmpError::BadXPath(
                        "unterminated selector value".to_string(),
                    ))
                }
            }
        }
    }

    fn expect(&mut self, expected: char) -> XmpResult<()> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(XmpError::BadXPath(format!(
                "expected '{}' but found '{}' in property path",
                expected, c
            ))),
            None => Err(XmpError::BadXPath(format!(
                "expected '{}' at end of property path",
                expected
            ))),
        }
    }
}

fn verify_qname(prefix: &str, local: &str) -> XmpResult<()> {
    if !is_ncname(prefix) || !is_ncname(local) {
        return Err(XmpError::BadXPath(format!(
            "'{}:{}' is not a legal qualified name",
            prefix, local
        )));
    }
    Ok(())
}

/// A non-root name must carry a registered prefix.
fn verify_qualified(name: &str) -> XmpResult<()> {
    let (prefix, local) = name
        .split_once(':')
        .ok_or_else(|| XmpError::BadXPath(format!("'{}' is missing a namespace prefix", name)))?;
    verify_qname(prefix, local)?;
    if namespace::uri_for_prefix(prefix).is_none() {
        return Err(XmpError::BadSchema(format!("unknown prefix '{}:'", prefix)));
    }
    Ok(())
}

/// Compose the path of an array item: `arrayName[3]` or `arrayName[last()]`.
///
/// The index `-1` selects the last item.
pub fn compose_array_item_path(array_name: &str, item_index: i32) -> XmpResult<String> {
    if array_name.is_empty() {
        return Err(XmpError::BadParam("empty array name".to_string()));
    }
    match item_index {
        -1 => Ok(format!("{}[last()]", array_name)),
        i if i > 0 => Ok(format!("{}[{}]", array_name, i)),
        i => Err(XmpError::BadParam(format!("bad array index {}", i))),
    }
}

/// Compose the path of a struct field: `structName/prefix:fieldName`.
pub fn compose_struct_field_path(
    struct_name: &str,
    field_ns: &str,
    field_name: &str,
) -> XmpResult<String> {
    if struct_name.is_empty() || field_name.is_empty() {
        return Err(XmpError::BadParam("empty struct or field name".to_string()));
    }
    let prefix = namespace::prefix_for_uri(field_ns)
        .ok_or_else(|| XmpError::BadSchema(format!("unregistered namespace '{}'", field_ns)))?;
    if !is_ncname(field_name) {
        return Err(XmpError::BadXPath(format!(
            "'{}' is not a legal field name",
            field_name
        )));
    }
    Ok(format!("{}/{}{}", struct_name, prefix, field_name))
}

/// Compose the path of a qualifier: `propName/?prefix:qualName`.
pub fn compose_qualifier_path(
    prop_name: &str,
    qual_ns: &str,
    qual_name: &str,
) -> XmpResult<String> {
    if prop_name.is_empty() || qual_name.is_empty() {
        return Err(XmpError::BadParam(
            "empty property or qualifier name".to_string(),
        ));
    }
    let prefix = namespace::prefix_for_uri(qual_ns)
        .ok_or_else(|| XmpError::BadSchema(format!("unregistered namespace '{}'", qual_ns)))?;
    if !is_ncname(qual_name) {
        return Err(XmpError::BadXPath(format!(
            "'{}' is not a legal qualifier name",
            qual_name
        )));
    }
    Ok(format!("{}/?{}{}", prop_name, prefix, qual_name))
}

/// Compose a field selector: `arrayName[prefix:fieldName="value"]`.
pub fn compose_field_selector(
    array_name: &str,
    field_ns: &str,
    field_name: &str,
    value: &str,
) -> XmpResult<String> {
    let prefix = namespace::prefix_for_uri(field_ns)
        .ok_or_else(|| XmpError::BadSchema(format!("unregistered namespace '{}'", field_ns)))?;
    if !is_ncname(field_name) {
        return Err(XmpError::BadXPath(format!(
            "'{}' is not a legal field name",
            field_name
        )));
    }
    Ok(format!(
        "{}[{}{}=\"{}\"]",
        array_name,
        prefix,
        field_name,
        escape_quotes(value)
    ))
}

/// Compose a language selector: `arrayName[?xml:lang="lang"]`.
pub fn compose_lang_selector(array_name: &str, lang: &str) -> XmpResult<String> {
    if array_name.is_empty() || lang.is_empty() {
        return Err(XmpError::BadParam("empty array name or language".to_string()));
    }
    Ok(format!(
        "{}[?xml:lang=\"{}\"]",
        array_name,
        escape_quotes(lang)
    ))
}
