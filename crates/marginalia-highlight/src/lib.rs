//! Highlights for Marginalia.
//!
//! # Modules
//!
//! - [`context`]: selection model and surrounding-sentence extraction
//! - [`poster`]: posting a selection as a NIP-84 highlight

pub mod context;
pub mod poster;

pub use context::{extract_context, extract_context_with, SelectionRange, TextPosition};
pub use poster::HighlightPoster;
