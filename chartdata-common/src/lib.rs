pub mod data;
pub mod error;
pub mod escape;

pub use chrono;
