//! XMP value types
//!
//! This module defines the public value types returned by the metadata API.

pub mod property;

pub use property::XmpProperty;
