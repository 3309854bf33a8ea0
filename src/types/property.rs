//! Property values returned by the metadata API
//!
//! A property value is always text in the graph; typed reads and writes
//! convert on demand. XMP booleans are canonically written "True"/"False",
//! with a lenient read for the lowercase and single-letter forms found in
//! the wild.

use crate::core::error::{XmpError, XmpResult};
use crate::core::options::PropertyOptions;
use std::fmt;

/// Canonical text of an XMP true value.
pub const TRUE_STR: &str = "True";
/// Canonical text of an XMP false value.
pub const FALSE_STR: &str = "False";

/// A property value together with its form flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpProperty {
    /// The string value; empty for schema, struct, and array nodes.
    pub value: String,
    /// The form flags of the node.
    pub options: PropertyOptions,
}

impl XmpProperty {
    pub fn new(value: impl Into<String>, options: PropertyOptions) -> Self {
        Self {
            value: value.into(),
            options,
        }
    }

    /// Parse the value as an XMP boolean.
    pub fn as_bool(&self) -> XmpResult<bool> {
        bool_from_xmp(&self.value)
    }

    pub fn as_i32(&self) -> XmpResult<i32> {
        self.value
            .trim()
            .parse()
            .map_err(|_| XmpError::BadValue(format!("'{}' is not an integer", self.value)))
    }

    pub fn as_i64(&self) -> XmpResult<i64> {
        self.value
            .trim()
            .parse()
            .map_err(|_| XmpError::BadValue(format!("'{}' is not an integer", self.value)))
    }

    pub fn as_f64(&self) -> XmpResult<f64> {
        self.value
            .trim()
            .parse()
            .map_err(|_| XmpError::BadValue(format!("'{}' is not a number", self.value)))
    }
}

impl fmt::Display for XmpProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for XmpProperty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

/// Parse an XMP boolean, accepting the canonical and common legacy forms.
pub fn bool_from_xmp(value: &str) -> XmpResult<bool> {
    match value.trim() {
        TRUE_STR | "true" | "TRUE" | "t" | "1" => Ok(true),
        FALSE_STR | "false" | "FALSE" | "f" | "0" => Ok(false),
        other => Err(XmpError::BadValue(format!("'{}' is not a boolean", other))),
    }
}

/// The canonical text for a boolean value.
pub fn bool_to_xmp(value: bool) -> &'static str {
    if value {
        TRUE_STR
    } else {
        FALSE_STR
    }
}
