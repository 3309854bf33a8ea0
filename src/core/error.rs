//! Error types for XMP operations
//!
//! Every fallible operation in the crate reports an [`XmpError`] carrying one
//! of the stable error codes used by embedders. Causes from the XML tokenizer
//! and from I/O are preserved as error sources.

use thiserror::Error;

/// Error types for XMP operations
#[derive(Debug, Error)]
pub enum XmpError {
    /// Bad parameter provided to a function
    #[error("bad parameter: {0}")]
    BadParam(String),

    /// Invalid or inconsistent option combination
    #[error("bad options: {0}")]
    BadOptions(String),

    /// Bad schema URI, prefix, or namespace registration
    #[error("bad schema: {0}")]
    BadSchema(String),

    /// Malformed property path expression
    #[error("bad XPath: {0}")]
    BadXPath(String),

    /// RDF constructions outside the accepted XMP subset
    #[error("bad RDF: {0}")]
    BadRdf(String),

    /// Structurally valid RDF that violates XMP semantics
    #[error("bad XMP: {0}")]
    BadXmp(String),

    /// Lexical XML error, including refused DOCTYPEs and bad encodings
    #[error("bad XML: {message}")]
    BadXml {
        message: String,
        #[source]
        source: Option<quick_xml::Error>,
    },

    /// Error from the underlying byte stream
    #[error("stream error")]
    BadStream(#[from] std::io::Error),

    /// Bad value (e.g. a typed accessor could not convert the text)
    #[error("bad value: {0}")]
    BadValue(String),

    /// Serialization failed (incompatible options or size overflow)
    #[error("bad serialize: {0}")]
    BadSerialize(String),

    /// Internal error (should not occur in normal operation)
    #[error("internal failure: {0}")]
    InternalFailure(String),

    /// Unclassified error
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl XmpError {
    /// Create a lexical XML error without an inner cause.
    pub fn bad_xml(message: impl Into<String>) -> Self {
        XmpError::BadXml {
            message: message.into(),
            source: None,
        }
    }

    /// The stable numeric code for this error, as used by embedders.
    pub fn code(&self) -> u32 {
        match self {
            XmpError::Unknown(_) => 0,
            XmpError::BadParam(_) => 4,
            XmpError::BadValue(_) => 5,
            XmpError::InternalFailure(_) => 9,
            XmpError::BadSchema(_) => 101,
            XmpError::BadXPath(_) => 102,
            XmpError::BadOptions(_) => 103,
            XmpError::BadSerialize(_) => 107,
            XmpError::BadXml { .. } => 201,
            XmpError::BadRdf(_) => 202,
            XmpError::BadXmp(_) => 203,
            XmpError::BadStream(_) => 204,
        }
    }
}

impl From<quick_xml::Error> for XmpError {
    fn from(err: quick_xml::Error) -> Self {
        XmpError::BadXml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias for XMP operations
pub type XmpResult<T> = Result<T, XmpError>;
