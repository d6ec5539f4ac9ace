//! Image variant support
//!
//! - Operation parsing (operation)
//! - Transformations and encoding backed by the `image` crate (transform)

pub mod operation;
pub mod transform;

pub use operation::{supported_operations, ImageOperation};
pub use transform::ImageTransformer;
