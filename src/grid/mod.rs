pub mod dataset;
pub mod error;
pub mod loader;
pub mod slicer;
