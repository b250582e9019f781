//! Exchange with external tools (feature `interchange`).
//!
//! - [`json`] - symbol-table dumps in, binding model and diagnostics out
//! - [`castxml`] - symbol tables from CastXML output

pub mod castxml;
pub mod json;

pub use castxml::{load_castxml, CastXmlError};
pub use json::{diagnostics_to_json, model_to_json, symbols_from_json, symbols_to_json};
