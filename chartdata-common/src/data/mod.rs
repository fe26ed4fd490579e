pub mod datum;
pub mod key;
