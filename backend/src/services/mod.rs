//! Business logic services for the image tagging service

pub mod image;

pub use image::ImageService;
