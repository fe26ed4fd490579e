#![allow(dead_code)]
pub mod datasets;
pub mod sinks;
