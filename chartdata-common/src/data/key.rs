use crate::data::datum::{Datum, DatumArray, DatumObject};
use ordered_float::OrderedFloat;

/// Hashable identity of a [`Datum`].
///
/// Primitives are keyed by value and arrays/objects by identity, so two distinct
/// objects that print the same are still distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DatumKey {
    Undefined,
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
    Date(i64),
    Array(DatumArray),
    Object(DatumObject),
}

impl From<&Datum> for DatumKey {
    fn from(value: &Datum) -> Self {
        match value {
            Datum::Undefined => DatumKey::Undefined,
            Datum::Null => DatumKey::Null,
            Datum::Bool(v) => DatumKey::Bool(*v),
            // -0 and 0 are the same key
            Datum::Number(v) if *v == 0.0 => DatumKey::Number(OrderedFloat(0.0)),
            Datum::Number(v) => DatumKey::Number(OrderedFloat(*v)),
            Datum::String(v) => DatumKey::String(v.clone()),
            Datum::Date(d) => DatumKey::Date(d.timestamp_millis()),
            Datum::Array(arr) => DatumKey::Array(arr.clone()),
            Datum::Object(obj) => DatumKey::Object(obj.clone()),
        }
    }
}

/// Key for a tuple of values, e.g. the key columns of one row
pub fn tuple_key<'a, I>(values: I) -> Vec<DatumKey>
where
    I: IntoIterator<Item = &'a Datum>,
{
    values.into_iter().map(DatumKey::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn test_primitive_keys_by_value() {
        let mut set = AHashSet::new();
        assert!(set.insert(DatumKey::from(&Datum::from("a"))));
        assert!(!set.insert(DatumKey::from(&Datum::from("a"))));
        assert!(set.insert(DatumKey::from(&Datum::Number(0.0))));
        assert!(!set.insert(DatumKey::from(&Datum::Number(-0.0))));
    }

    #[test]
    fn test_object_keys_by_identity() {
        let a = DatumObject::with_label([("id", Datum::from(1.0))], "A");
        let b = DatumObject::with_label([("id", Datum::from(1.0))], "A");
        let key_a = DatumKey::from(&Datum::Object(a.clone()));
        assert_eq!(key_a, DatumKey::from(&Datum::Object(a)));
        assert_ne!(key_a, DatumKey::from(&Datum::Object(b)));
    }
}
