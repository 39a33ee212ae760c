//! Shared types and logic for the image tagging service
//!
//! Everything here is free of I/O: image models, provider response
//! envelopes, upload validation and tag search semantics.

pub mod models;
pub mod tag_query;
pub mod validation;

pub use models::*;
pub use tag_query::*;
pub use validation::*;
