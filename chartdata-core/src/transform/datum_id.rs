use chartdata_common::data::datum::{format_number, Datum};
use itertools::Itertools;

const ID_SEPARATOR: &str = "___";

/// Stable text form of one key value. Dates print as epoch milliseconds so that the
/// same instant yields the same id whichever timezone produced it.
pub fn datum_id_part(value: &Datum) -> String {
    match value {
        Datum::Number(v) => format_number(*v),
        Datum::Date(d) => d.timestamp_millis().to_string(),
        Datum::Array(values) => values.iter().map(datum_id_part).join(","),
        other => other.to_string(),
    }
}

/// Identity of a group or row across pipeline runs, built from its key tuple
pub fn create_datum_id<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a Datum>,
{
    keys.into_iter().map(datum_id_part).join(ID_SEPARATOR)
}
