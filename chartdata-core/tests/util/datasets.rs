use chartdata_common::data::datum::{records_from_json, Records};
use serde_json::json;

/// Two series of quarterly figures, one row per quarter and series
pub fn quarterly_sales() -> Records {
    records_from_json(&json!([
        {"quarter": "Q1", "series": "north", "revenue": 10, "cost": -4},
        {"quarter": "Q1", "series": "south", "revenue": 30, "cost": -6},
        {"quarter": "Q2", "series": "north", "revenue": 20, "cost": -5},
        {"quarter": "Q2", "series": "south", "revenue": 20, "cost": -15},
        {"quarter": "Q3", "series": "north", "revenue": 5, "cost": 0},
        {"quarter": "Q3", "series": "south", "revenue": 15, "cost": -2}
    ]))
}

pub fn key_value_rows(rows: &[(&str, f64)]) -> Records {
    records_from_json(&serde_json::Value::Array(
        rows.iter().map(|(k, v)| json!({"k": k, "v": v})).collect(),
    ))
}
