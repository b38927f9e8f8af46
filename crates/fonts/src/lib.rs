//! Font assets shipped to overlays: directory scan, format detection and
//! base64 encoding.

pub mod error;
pub mod scan;

pub use {
    error::{Error, Result},
    scan::{FontKind, load_fonts},
};
