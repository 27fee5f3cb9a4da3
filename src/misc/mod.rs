pub mod binary_reader;
pub mod resource_id;
pub mod resource_type;
