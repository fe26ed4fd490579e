use crate::spec::property::ValueType;
use ahash::{AHashMap, AHashSet};
use chartdata_common::data::datum::Datum;
use chartdata_common::data::key::DatumKey;
use serde::{Deserialize, Serialize};

/// Observed extent of one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// `[min, max]`, or `None` when no finite value was observed
    Range(Option<[f64; 2]>),
    /// Distinct values in first-seen order
    Category(Vec<Datum>),
}

impl Domain {
    pub fn empty(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Range => Domain::Range(None),
            ValueType::Category => Domain::Category(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Domain::Range(extent) => extent.is_none(),
            Domain::Category(values) => values.is_empty(),
        }
    }

    pub fn as_range(&self) -> Option<[f64; 2]> {
        match self {
            Domain::Range(extent) => *extent,
            Domain::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&[Datum]> {
        match self {
            Domain::Category(values) => Some(values),
            Domain::Range(_) => None,
        }
    }
}

/// Incremental domain of a single property
#[derive(Debug, Clone)]
pub enum DomainInitializer {
    Range { min: f64, max: f64 },
    Category {
        seen: AHashSet<DatumKey>,
        values: Vec<Datum>,
    },
}

impl DomainInitializer {
    pub fn new(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Range => DomainInitializer::Range {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            ValueType::Category => DomainInitializer::Category {
                seen: AHashSet::new(),
                values: Vec::new(),
            },
        }
    }

    /// Undefined values never become category members, so a category domain can be
    /// shorter than the column it was built from.
    pub fn observe(&mut self, value: &Datum) {
        match self {
            DomainInitializer::Range { min, max } => {
                if let Some(v) = value.as_finite_f64() {
                    *min = min.min(v);
                    *max = max.max(v);
                }
            }
            DomainInitializer::Category { seen, values } => {
                if value.is_undefined() {
                    return;
                }
                // Distinct objects are distinct members, even when they print the same
                if seen.insert(DatumKey::from(value)) {
                    values.push(value.clone());
                }
            }
        }
    }

    pub fn observe_f64(&mut self, value: f64) {
        if let DomainInitializer::Range { min, max } = self {
            if value.is_finite() {
                *min = min.min(value);
                *max = max.max(value);
            }
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            DomainInitializer::Range { min, max } => {
                if min > max {
                    Domain::Range(None)
                } else {
                    Domain::Range(Some([*min, *max]))
                }
            }
            DomainInitializer::Category { values, .. } => Domain::Category(values.clone()),
        }
    }

    /// Domain of a whole column
    pub fn from_column(value_type: ValueType, column: &[Datum]) -> Domain {
        let mut initializer = Self::new(value_type);
        for value in column {
            initializer.observe(value);
        }
        initializer.domain()
    }
}

/// Per-property domains, keyed by property name
#[derive(Debug, Clone, Default)]
pub struct DomainTracker {
    initializers: AHashMap<String, DomainInitializer>,
}

impl DomainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `property`. Re-initializing an already tracked property keeps
    /// what it has observed so far.
    pub fn init(&mut self, property: &str, value_type: ValueType) {
        self.initializers
            .entry(property.to_string())
            .or_insert_with(|| DomainInitializer::new(value_type));
    }

    pub fn observe(&mut self, property: &str, value: &Datum) {
        if let Some(initializer) = self.initializers.get_mut(property) {
            initializer.observe(value);
        }
    }

    pub fn read_domain(&self, property: &str) -> Option<Domain> {
        self.initializers.get(property).map(DomainInitializer::domain)
    }
}
