use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Prefix for datetime values JSON encoded as strings
pub const DATETIME_PREFIX: &str = "__$datetime:";

/// An ordered collection of records. The `Arc` identity of a `Records` value is
/// what distinguishes one data source from another.
pub type Records = Arc<Vec<Datum>>;

/// A dynamically typed value read from (or stored into) an application record.
///
/// Equality is strict: primitives compare by value (`NaN` is never equal to
/// itself), while arrays and objects compare by identity.
#[derive(Clone, Debug, Default)]
pub enum Datum {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(DatumArray),
    Object(DatumObject),
}

impl Datum {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Datum::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// True for both `Undefined` and `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Datum::Undefined | Datum::Null)
    }

    /// Numeric view of the value: numbers as-is and dates as epoch milliseconds
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(v) => Some(*v),
            Datum::Date(d) => Some(d.timestamp_millis() as f64),
            _ => None,
        }
    }

    pub fn as_finite_f64(&self) -> Option<f64> {
        self.as_f64().filter(|v| v.is_finite())
    }

    pub fn is_finite_number(&self) -> bool {
        matches!(self, Datum::Number(v) if v.is_finite())
    }

    pub fn is_negative(&self) -> bool {
        matches!(self.as_f64(), Some(v) if v < 0.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&DatumObject> {
        match self {
            Datum::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&DatumArray> {
        match self {
            Datum::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Look up a direct field of an object value
    pub fn get(&self, field: &str) -> Option<&Datum> {
        self.as_object().and_then(|obj| obj.get(field))
    }

    /// Look up a nested field, one path segment per object level
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Datum> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first.as_ref())?;
        for segment in rest {
            current = current.get(segment.as_ref())?;
        }
        Some(current)
    }

    pub fn from_millis(millis: i64) -> Datum {
        match Utc.timestamp_millis_opt(millis).single() {
            Some(date) => Datum::Date(date),
            None => Datum::Number(millis as f64),
        }
    }

    pub fn from_json(value: &Value) -> Datum {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(v) => Datum::Bool(*v),
            Value::Number(v) => Datum::Number(v.as_f64().unwrap_or(f64::NAN)),
            Value::String(v) => match v.strip_prefix(DATETIME_PREFIX) {
                Some(millis) => match millis.parse::<i64>() {
                    Ok(millis) => Datum::from_millis(millis),
                    Err(_) => Datum::String(v.clone()),
                },
                None => Datum::String(v.clone()),
            },
            Value::Array(elements) => {
                Datum::Array(DatumArray::new(elements.iter().map(Datum::from_json).collect()))
            }
            Value::Object(fields) => Datum::Object(DatumObject::new(
                fields
                    .iter()
                    .map(|(name, val)| (name.clone(), Datum::from_json(val))),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Datum::Undefined | Datum::Null => Value::Null,
            Datum::Bool(v) => Value::Bool(*v),
            Datum::Number(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Datum::String(v) => Value::String(v.clone()),
            Datum::Date(d) => Value::String(format!("{DATETIME_PREFIX}{}", d.timestamp_millis())),
            Datum::Array(arr) => Value::Array(arr.iter().map(Datum::to_json).collect()),
            Datum::Object(obj) => {
                let mut fields = Map::new();
                for (name, val) in obj.fields() {
                    fields.insert(name.clone(), val.to_json());
                }
                Value::Object(fields)
            }
        }
    }
}

/// Format a number the way a record's value would be printed in a label: integral
/// values without a fractional part, non-finite values by name.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Undefined => write!(f, "undefined"),
            Datum::Null => write!(f, "null"),
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Number(v) => write!(f, "{}", format_number(*v)),
            Datum::String(v) => write!(f, "{v}"),
            Datum::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Datum::Array(arr) => {
                for (i, el) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{el}")?;
                }
                Ok(())
            }
            Datum::Object(obj) => write!(f, "{}", obj.label().unwrap_or("[object Object]")),
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Undefined, Datum::Undefined) => true,
            (Datum::Null, Datum::Null) => true,
            (Datum::Bool(a), Datum::Bool(b)) => a == b,
            (Datum::Number(a), Datum::Number(b)) => a == b,
            (Datum::String(a), Datum::String(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            (Datum::Array(a), Datum::Array(b)) => a == b,
            (Datum::Object(a), Datum::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Datum::from_json(&value))
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Number(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Number(v as f64)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Number(v as f64)
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Bool(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl From<DateTime<Utc>> for Datum {
    fn from(v: DateTime<Utc>) -> Self {
        Datum::Date(v)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(v: Vec<Datum>) -> Self {
        Datum::Array(DatumArray::new(v))
    }
}

impl From<DatumObject> for Datum {
    fn from(v: DatumObject) -> Self {
        Datum::Object(v)
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        Datum::from_json(&v)
    }
}

impl From<&Value> for Datum {
    fn from(v: &Value) -> Self {
        Datum::from_json(v)
    }
}

/// Shared, identity-compared array value
#[derive(Clone)]
pub struct DatumArray(Arc<Vec<Datum>>);

impl DatumArray {
    pub fn new(values: Vec<Datum>) -> Self {
        Self(Arc::new(values))
    }

    pub fn values(&self) -> &[Datum] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DatumArray {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DatumArray {}

impl Hash for DatumArray {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl fmt::Debug for DatumArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[derive(Debug)]
struct ObjectInner {
    fields: BTreeMap<String, Datum>,
    label: Option<String>,
}

/// Shared, identity-compared record object.
///
/// The optional label is the object's custom string form, used wherever the
/// object has to be printed (datum ids, warnings).
#[derive(Clone)]
pub struct DatumObject(Arc<ObjectInner>);

impl DatumObject {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Datum)>,
        K: Into<String>,
    {
        Self(Arc::new(ObjectInner {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            label: None,
        }))
    }

    pub fn with_label<I, K, L>(fields: I, label: L) -> Self
    where
        I: IntoIterator<Item = (K, Datum)>,
        K: Into<String>,
        L: Into<String>,
    {
        Self(Arc::new(ObjectInner {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            label: Some(label.into()),
        }))
    }

    pub fn get(&self, field: &str) -> Option<&Datum> {
        self.0.fields.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Datum)> {
        self.0.fields.iter()
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DatumObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DatumObject {}

impl Hash for DatumObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl fmt::Debug for DatumObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.label {
            Some(label) => write!(f, "DatumObject({label:?}, {:?})", self.0.fields),
            None => write!(f, "DatumObject({:?})", self.0.fields),
        }
    }
}

/// Build `Records` from a JSON array of objects
pub fn records_from_json(value: &Value) -> Records {
    match value {
        Value::Array(rows) => Arc::new(rows.iter().map(Datum::from_json).collect()),
        other => Arc::new(vec![Datum::from_json(other)]),
    }
}
