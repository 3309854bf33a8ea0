//! XMP Core for Rust
//!
//! A pure Rust implementation of the XMP (Extensible Metadata Platform)
//! data model: an in-memory metadata graph, an XPath-like property
//! addressing language, an RDF/XML parser with normalization, and a
//! canonical serializer that emits embeddable packets.
//!
//! The main entry point is [`XmpMeta`]:
//!
//! ```rust
//! use xmpcore::{xmp_ns, XmpMeta};
//!
//! let mut meta = XmpMeta::new();
//! meta.set_property(xmp_ns::XMP, "CreatorTool", "MyApp").unwrap();
//!
//! let packet = meta.to_string_with_options(Default::default()).unwrap();
//! let parsed: XmpMeta = packet.parse().unwrap();
//! assert_eq!(
//!     parsed.property(xmp_ns::XMP, "CreatorTool").unwrap().value,
//!     "MyApp"
//! );
//! ```

pub mod core;
pub mod types;
pub mod utils;

pub use crate::core::error::{XmpError, XmpResult};
pub use crate::core::iterator::{XmpIterItem, XmpIterator};
pub use crate::core::metadata::{XmpMeta, LAST_ITEM};
pub use crate::core::namespace::{
    ns as xmp_ns, register_alias, register_namespace, registered_namespaces, reset_registry,
    resolve_alias, AliasInfo,
};
pub use crate::core::options::{
    AliasForm, IterOptions, ParseOptions, PropertyOptions, SerializeOptions, XmpEncoding,
};
pub use crate::core::xpath::{
    compose_array_item_path, compose_field_selector, compose_lang_selector,
    compose_qualifier_path, compose_struct_field_path, XmpPath, XmpPathStep,
};
pub use crate::types::property::XmpProperty;
pub use crate::utils::datetime::XmpDateTime;
pub use crate::utils::packaging::{package_for_jpeg, JpegPackets};
