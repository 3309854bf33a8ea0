//! Utility helpers
//!
//! Date/time handling for ISO 8601 values held in the graph, and the JPEG
//! packet packaging helper.

pub mod datetime;
pub mod packaging;

pub use datetime::XmpDateTime;
pub use packaging::{package_for_jpeg, JpegPackets};
