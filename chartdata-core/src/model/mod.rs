pub mod data_model;
pub mod options;
pub mod processed;
