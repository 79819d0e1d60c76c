//! URL handling module for Harvester
//!
//! This module provides seed parsing, reference resolution with fragment
//! stripping (the canonical form used as the dedup key), host extraction, and
//! file-extension matching on URL paths and attribute values.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use matcher::{match_extension, ExtensionMatch};
pub use normalize::{parse_seed, resolve_reference, strip_fragment};
