//! Pipeline stages run by [`DataModel::process_data`](crate::model::data_model::DataModel::process_data),
//! in the order grouping, aggregation, value processors, reducers, processors.
pub mod aggregate;
pub mod datum_id;
pub mod diff;
pub mod group;
pub mod normalise;
pub mod process;
pub mod reduce;
