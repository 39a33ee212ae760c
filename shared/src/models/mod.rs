//! Domain models for the image tagging service

mod image;
mod tagging;

pub use image::*;
pub use tagging::*;
