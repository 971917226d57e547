//! exposure_data.json input schema
//!
//! This module defines the typed shape of the exposure log and the parser
//! that validates it and flattens it into record streams.

mod exposure_log;
mod parser;

pub use exposure_log::*;
pub use parser::*;
