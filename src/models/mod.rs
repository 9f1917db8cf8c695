pub mod common;
pub mod gemini;
pub mod image;

pub use common::*;
pub use image::*;
