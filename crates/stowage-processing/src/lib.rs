//! Stowage Processing Library
//!
//! Turns the declared variants of a stored file into derived objects. Image
//! operations are parsed from the declarations, applied with the `image` crate,
//! optionally passed through an external optimizer and written back through the
//! storage service.

pub mod image;
pub mod optimizer;
pub mod stack;
pub mod staging;
pub mod traits;
pub mod variant_processor;

// Re-export commonly used types
pub use crate::image::{supported_operations, ImageOperation, ImageTransformer};
pub use optimizer::{CommandOptimizer, Optimizer, OptimizerTool, PassthroughOptimizer};
pub use stack::StackProcessor;
pub use staging::Scratch;
pub use traits::Processor;
pub use variant_processor::VariantProcessor;
