use crate::model::processed::ProcessedData;
use crate::spec::function::SharedFn;
use crate::transform::reduce::DatumView;
use chartdata_common::data::datum::Datum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Whether a property is numeric-continuous or discrete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Range,
    Category,
}

/// `(value, record) -> bool`
pub type ValidationFn = SharedFn<dyn Fn(&Datum, &Datum) -> bool + Send + Sync>;

/// Stateful per-run transform produced by a [`ValueProcessorFactory`]
pub type ValueTransform = Box<dyn FnMut(&Datum) -> Datum + Send>;
pub type ValueProcessorFactory = SharedFn<dyn Fn() -> ValueTransform + Send + Sync>;

/// Computes an aggregate pair from every matched value of one group (or row)
pub type AggregateFn = SharedFn<dyn Fn(&[Datum]) -> [f64; 2] + Send + Sync>;

/// `(columns, value column indices, row index)`
pub type GroupValueAdjustFn = Box<dyn FnMut(&mut [Vec<Datum>], &[usize], usize) + Send>;
pub type GroupValueAdjustFactory = SharedFn<dyn Fn() -> GroupValueAdjustFn + Send + Sync>;

/// `(processed data, value column index)`
pub type PropertyAdjustFn = SharedFn<dyn Fn(&mut ProcessedData, usize) + Send + Sync>;

pub type ReducerFn = Box<dyn FnMut(Datum, &DatumView<'_>) -> Datum + Send>;
pub type ReducerFactory = SharedFn<dyn Fn() -> ReducerFn + Send + Sync>;

pub type ProcessorFn = SharedFn<dyn Fn(&ProcessedData) -> Datum + Send + Sync>;

/// Extraction of one named field of each record, as a key or as a value column
#[derive(Debug, Clone)]
pub struct DatumPropertyDefinition {
    /// Field name. Dotted names address nested objects unless dot notation is
    /// suppressed on the model.
    pub property: String,
    pub value_type: ValueType,
    pub id: Option<String>,
    pub scopes: Vec<String>,
    /// Requester scope to the ids it knows this definition by
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    pub group_id: Option<String>,
    pub validation: Option<ValidationFn>,
    pub invalid_value: Option<Datum>,
    pub missing_value: Option<Datum>,
    /// Replaces every extracted value, keeping the sign of the source value
    pub force_value: Option<f64>,
    pub processor: Option<ValueProcessorFactory>,
}

impl DatumPropertyDefinition {
    pub fn new<S: Into<String>>(property: S, value_type: ValueType) -> Self {
        Self {
            property: property.into(),
            value_type,
            id: None,
            scopes: Vec::new(),
            ids_map: Default::default(),
            group_id: None,
            validation: None,
            invalid_value: None,
            missing_value: None,
            force_value: None,
            processor: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AggregateFunction {
    /// `[negative sum, positive sum]`
    Sum,
    /// `[min, max]`
    Range,
    /// `[0, number of values]`
    Count,
    Custom(AggregateFn),
}

#[derive(Debug, Clone)]
pub struct AggregatePropertyDefinition {
    pub id: Option<String>,
    pub scopes: Vec<String>,
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    pub match_group_ids: Vec<String>,
    pub function: AggregateFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormaliseMode {
    /// The matched columns of a row contribute to one running total
    Sum,
    /// Extremes of the matched columns are taken independently
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulateMode {
    /// Each column holds the total up to and including itself
    Normal,
    /// Each column holds the total of the columns before it
    Trailing,
}

#[derive(Debug, Clone)]
pub enum GroupValueAdjust {
    Normalise {
        normalise_to: f64,
        mode: NormaliseMode,
    },
    Accumulate {
        mode: AccumulateMode,
        separate_negative: bool,
    },
    Custom(GroupValueAdjustFactory),
}

#[derive(Debug, Clone)]
pub struct GroupValueProcessorDefinition {
    pub id: Option<String>,
    pub scopes: Vec<String>,
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    pub match_group_ids: Vec<String>,
    pub adjust: GroupValueAdjust,
}

#[derive(Debug, Clone)]
pub enum PropertyAdjust {
    Normalise {
        normalise_to: [f64; 2],
        zero_domain: f64,
        range_min: Option<f64>,
        range_max: Option<f64>,
    },
    Custom(PropertyAdjustFn),
}

#[derive(Debug, Clone)]
pub struct PropertyValueProcessorDefinition {
    pub id: Option<String>,
    pub scopes: Vec<String>,
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    /// Name of the value property whose column is adjusted
    pub property: String,
    pub adjust: PropertyAdjust,
}

#[derive(Debug, Clone)]
pub struct ReducerDefinition {
    pub id: Option<String>,
    pub scopes: Vec<String>,
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    /// Name the result is stored under in `ProcessedData::reduced`
    pub property: String,
    pub initial_value: Datum,
    pub reducer: ReducerFactory,
}

#[derive(Debug, Clone)]
pub enum ProcessorKind {
    SortDomainGroups,
    AnimationValidation {
        /// Value ids whose columns are checked along with the keys
        value_ids: Option<Vec<String>>,
    },
    Diff {
        previous: Option<Arc<ProcessedData>>,
        update_moved_data: bool,
    },
    Custom(ProcessorFn),
}

#[derive(Debug, Clone)]
pub struct ProcessorDefinition {
    pub id: Option<String>,
    pub scopes: Vec<String>,
    pub ids_map: BTreeMap<String, BTreeSet<String>>,
    /// Name the result is stored under in `ProcessedData::reduced`
    pub property: String,
    pub calculate: ProcessorKind,
}

#[derive(Debug, Clone)]
pub enum PropertyDefinition {
    Key(DatumPropertyDefinition),
    Value(DatumPropertyDefinition),
    Aggregate(AggregatePropertyDefinition),
    GroupValueProcessor(GroupValueProcessorDefinition),
    PropertyValueProcessor(PropertyValueProcessorDefinition),
    Reducer(ReducerDefinition),
    Processor(ProcessorDefinition),
}

impl PropertyDefinition {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyDefinition::Key(_) => "key",
            PropertyDefinition::Value(_) => "value",
            PropertyDefinition::Aggregate(_) => "aggregate",
            PropertyDefinition::GroupValueProcessor(_) => "group-value-processor",
            PropertyDefinition::PropertyValueProcessor(_) => "property-value-processor",
            PropertyDefinition::Reducer(_) => "reducer",
            PropertyDefinition::Processor(_) => "processor",
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, PropertyDefinition::Key(_))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, PropertyDefinition::Value(_))
    }

    pub fn as_datum(&self) -> Option<&DatumPropertyDefinition> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_datum_mut(&mut self) -> Option<&mut DatumPropertyDefinition> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => Some(def),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => def.id.as_deref(),
            PropertyDefinition::Aggregate(def) => def.id.as_deref(),
            PropertyDefinition::GroupValueProcessor(def) => def.id.as_deref(),
            PropertyDefinition::PropertyValueProcessor(def) => def.id.as_deref(),
            PropertyDefinition::Reducer(def) => def.id.as_deref(),
            PropertyDefinition::Processor(def) => def.id.as_deref(),
        }
    }

    pub fn scopes(&self) -> &[String] {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => &def.scopes,
            PropertyDefinition::Aggregate(def) => &def.scopes,
            PropertyDefinition::GroupValueProcessor(def) => &def.scopes,
            PropertyDefinition::PropertyValueProcessor(def) => &def.scopes,
            PropertyDefinition::Reducer(def) => &def.scopes,
            PropertyDefinition::Processor(def) => &def.scopes,
        }
    }

    pub fn id_mut(&mut self) -> &mut Option<String> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => &mut def.id,
            PropertyDefinition::Aggregate(def) => &mut def.id,
            PropertyDefinition::GroupValueProcessor(def) => &mut def.id,
            PropertyDefinition::PropertyValueProcessor(def) => &mut def.id,
            PropertyDefinition::Reducer(def) => &mut def.id,
            PropertyDefinition::Processor(def) => &mut def.id,
        }
    }

    pub fn scopes_mut(&mut self) -> &mut Vec<String> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => &mut def.scopes,
            PropertyDefinition::Aggregate(def) => &mut def.scopes,
            PropertyDefinition::GroupValueProcessor(def) => &mut def.scopes,
            PropertyDefinition::PropertyValueProcessor(def) => &mut def.scopes,
            PropertyDefinition::Reducer(def) => &mut def.scopes,
            PropertyDefinition::Processor(def) => &mut def.scopes,
        }
    }

    pub fn ids_map(&self) -> &BTreeMap<String, BTreeSet<String>> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => &def.ids_map,
            PropertyDefinition::Aggregate(def) => &def.ids_map,
            PropertyDefinition::GroupValueProcessor(def) => &def.ids_map,
            PropertyDefinition::PropertyValueProcessor(def) => &def.ids_map,
            PropertyDefinition::Reducer(def) => &def.ids_map,
            PropertyDefinition::Processor(def) => &def.ids_map,
        }
    }

    pub fn ids_map_mut(&mut self) -> &mut BTreeMap<String, BTreeSet<String>> {
        match self {
            PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => &mut def.ids_map,
            PropertyDefinition::Aggregate(def) => &mut def.ids_map,
            PropertyDefinition::GroupValueProcessor(def) => &mut def.ids_map,
            PropertyDefinition::PropertyValueProcessor(def) => &mut def.ids_map,
            PropertyDefinition::Reducer(def) => &mut def.ids_map,
            PropertyDefinition::Processor(def) => &mut def.ids_map,
        }
    }

    /// Group ids an aggregate or group-value processor applies to
    pub fn match_group_ids(&self) -> Option<&[String]> {
        match self {
            PropertyDefinition::Aggregate(def) => Some(&def.match_group_ids),
            PropertyDefinition::GroupValueProcessor(def) => Some(&def.match_group_ids),
            _ => None,
        }
    }

    /// Whether this definition answers to `id` when queried from `scope`
    pub fn matches_id(&self, scope: &str, id: &str) -> bool {
        tracked_id_matches(self.id(), self.scopes(), self.ids_map(), scope, id)
    }
}

/// Id resolution shared by every definition kind.
///
/// A definition that merging tagged with ids for `scope` answers to those ids only.
/// Otherwise its own id applies, to every scope when it has none.
pub fn tracked_id_matches(
    own_id: Option<&str>,
    scopes: &[String],
    ids_map: &BTreeMap<String, BTreeSet<String>>,
    scope: &str,
    id: &str,
) -> bool {
    if let Some(ids) = ids_map.get(scope) {
        return ids.contains(id);
    }
    own_id == Some(id) && (scopes.is_empty() || scopes.iter().any(|s| s == scope))
}

impl DatumPropertyDefinition {
    pub fn matches_id(&self, scope: &str, id: &str) -> bool {
        tracked_id_matches(self.id.as_deref(), &self.scopes, &self.ids_map, scope, id)
    }
}

impl AggregatePropertyDefinition {
    pub fn matches_id(&self, scope: &str, id: &str) -> bool {
        tracked_id_matches(self.id.as_deref(), &self.scopes, &self.ids_map, scope, id)
    }
}
