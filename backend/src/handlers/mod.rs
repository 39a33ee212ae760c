//! HTTP handlers

pub mod health;
pub mod image;

pub use health::health_check;
pub use image::{get_image, list_images, upload_image};
