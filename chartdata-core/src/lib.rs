#[macro_use]
extern crate lazy_static;

pub mod domain;
pub mod model;
pub mod spec;
pub mod transform;

pub use chartdata_common::data::datum::{Datum, Records};
pub use chartdata_common::error::{ChartDataError, Result};
