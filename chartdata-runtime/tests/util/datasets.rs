use chartdata_common::data::datum::{records_from_json, Records};
use chartdata_core::model::options::DataModelOptions;
use chartdata_core::spec::builders::{is_finite_number, key_property, sum, value_property};
use chartdata_core::spec::property::ValueType;
use serde_json::json;

pub fn monthly_visits() -> Records {
    records_from_json(&json!([
        {"month": "Jan", "desktop": 120, "mobile": 80},
        {"month": "Feb", "desktop": 90, "mobile": 110},
        {"month": "Mar", "desktop": "n/a", "mobile": 95},
        {"month": "Apr", "desktop": 140, "mobile": 70}
    ]))
}

/// Options a bar series plotting `field` against the month would request
pub fn series_options(field: &str, y_id: &str) -> DataModelOptions {
    DataModelOptions::new(vec![
        key_property("month", ValueType::Category).with_id("xValue"),
        value_property(field, ValueType::Range)
            .with_id(y_id)
            .with_group_id("visits")
            .with_validation_fn(is_finite_number()),
        sum(["visits"]).with_id("total"),
    ])
}
