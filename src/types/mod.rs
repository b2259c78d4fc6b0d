pub mod bounding_box;
pub mod region;
pub mod region_record;
pub mod region_table;
pub mod variable;
