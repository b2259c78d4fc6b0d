pub mod bounding_box;
pub mod error;
pub mod gazetteer;
