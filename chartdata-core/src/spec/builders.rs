//! Constructors for the common property definitions.
//!
//! ```
//! use chartdata_core::spec::builders::{key_property, sum, value_property};
//! use chartdata_core::spec::property::ValueType;
//!
//! let props = vec![
//!     key_property("quarter", ValueType::Category).with_id("xValue"),
//!     value_property("revenue", ValueType::Range)
//!         .with_id("yValue")
//!         .with_group_id("stack"),
//!     sum(["stack"]),
//! ];
//! assert_eq!(props.len(), 3);
//! ```
use crate::model::processed::ProcessedData;
use crate::spec::function::SharedFn;
use crate::spec::property::{
    AccumulateMode, AggregateFn, AggregateFunction, AggregatePropertyDefinition,
    DatumPropertyDefinition, GroupValueAdjust, GroupValueAdjustFn, GroupValueProcessorDefinition,
    NormaliseMode, ProcessorDefinition, ProcessorFn, ProcessorKind, PropertyAdjust,
    PropertyAdjustFn, PropertyDefinition, PropertyValueProcessorDefinition, ReducerDefinition,
    ReducerFn, ValidationFn, ValueProcessorFactory, ValueTransform, ValueType,
};
use crate::transform::reduce::DatumView;
use chartdata_common::data::datum::Datum;
use std::sync::Arc;

pub const SMALLEST_KEY_INTERVAL: &str = "smallest_key_interval";
pub const LARGEST_KEY_INTERVAL: &str = "largest_key_interval";
pub const SORTED_GROUP_DOMAIN: &str = "sorted_group_domain";
pub const ANIMATION_VALIDATION: &str = "animation_validation";
pub const DIFF: &str = "diff";

lazy_static! {
    static ref IS_FINITE_NUMBER: ValidationFn = validation_fn(|value, _| value.is_finite_number());
    static ref IS_DEFINED: ValidationFn = validation_fn(|value, _| !value.is_nullish());
}

/// Shared predicate accepting finite numbers only
pub fn is_finite_number() -> ValidationFn {
    IS_FINITE_NUMBER.clone()
}

/// Shared predicate accepting anything but `null` and `undefined`
pub fn is_defined() -> ValidationFn {
    IS_DEFINED.clone()
}

pub fn validation_fn<F>(f: F) -> ValidationFn
where
    F: Fn(&Datum, &Datum) -> bool + Send + Sync + 'static,
{
    let f: Arc<dyn Fn(&Datum, &Datum) -> bool + Send + Sync> = Arc::new(f);
    SharedFn::from_arc(f)
}

pub fn value_processor<F>(factory: F) -> ValueProcessorFactory
where
    F: Fn() -> ValueTransform + Send + Sync + 'static,
{
    let factory: Arc<dyn Fn() -> ValueTransform + Send + Sync> = Arc::new(factory);
    SharedFn::from_arc(factory)
}

pub fn aggregate_fn<F>(f: F) -> AggregateFn
where
    F: Fn(&[Datum]) -> [f64; 2] + Send + Sync + 'static,
{
    let f: Arc<dyn Fn(&[Datum]) -> [f64; 2] + Send + Sync> = Arc::new(f);
    SharedFn::from_arc(f)
}

pub fn processor_fn<F>(f: F) -> ProcessorFn
where
    F: Fn(&ProcessedData) -> Datum + Send + Sync + 'static,
{
    let f: Arc<dyn Fn(&ProcessedData) -> Datum + Send + Sync> = Arc::new(f);
    SharedFn::from_arc(f)
}

pub fn property_adjust_fn<F>(f: F) -> PropertyAdjustFn
where
    F: Fn(&mut ProcessedData, usize) + Send + Sync + 'static,
{
    let f: Arc<dyn Fn(&mut ProcessedData, usize) + Send + Sync> = Arc::new(f);
    SharedFn::from_arc(f)
}

pub fn key_property<S: Into<String>>(property: S, value_type: ValueType) -> PropertyDefinition {
    PropertyDefinition::Key(DatumPropertyDefinition::new(property, value_type))
}

pub fn value_property<S: Into<String>>(property: S, value_type: ValueType) -> PropertyDefinition {
    PropertyDefinition::Value(DatumPropertyDefinition::new(property, value_type))
}

lazy_static! {
    static ref ACCUMULATED_VALUE: ValueProcessorFactory = accumulated_value(false);
    static ref ACCUMULATED_POSITIVE_VALUE: ValueProcessorFactory = accumulated_value(true);
    static ref TRAILING_ACCUMULATED_VALUE: ValueProcessorFactory =
        value_processor(|| -> ValueTransform {
            let mut total = 0.0;
            Box::new(move |datum: &Datum| match datum {
                Datum::Number(v) if v.is_finite() => {
                    let trailing = total;
                    total += v;
                    Datum::Number(trailing)
                }
                other => other.clone(),
            })
        });
}

fn accumulated_value(only_positive: bool) -> ValueProcessorFactory {
    value_processor(move || -> ValueTransform {
        let mut total = 0.0;
        Box::new(move |datum: &Datum| match datum {
            Datum::Number(v) if v.is_finite() => {
                total += if only_positive { v.max(0.0) } else { *v };
                Datum::Number(total)
            }
            other => other.clone(),
        })
    })
}

/// Value column holding the running total of the field, in record order
pub fn accumulative_value_property<S: Into<String>>(
    property: S,
    value_type: ValueType,
    only_positive: bool,
) -> PropertyDefinition {
    let processor = if only_positive {
        ACCUMULATED_POSITIVE_VALUE.clone()
    } else {
        ACCUMULATED_VALUE.clone()
    };
    let mut def = DatumPropertyDefinition::new(property, value_type);
    def.processor = Some(processor);
    PropertyDefinition::Value(def)
}

/// Value column holding the total of the records before each one
pub fn trailing_accumulated_value_property<S: Into<String>>(
    property: S,
    value_type: ValueType,
) -> PropertyDefinition {
    let mut def = DatumPropertyDefinition::new(property, value_type);
    def.processor = Some(TRAILING_ACCUMULATED_VALUE.clone());
    PropertyDefinition::Value(def)
}

fn aggregate<I, S>(match_group_ids: I, function: AggregateFunction) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PropertyDefinition::Aggregate(AggregatePropertyDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        match_group_ids: match_group_ids.into_iter().map(Into::into).collect(),
        function,
    })
}

pub fn sum<I, S>(match_group_ids: I) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    aggregate(match_group_ids, AggregateFunction::Sum)
}

pub fn range<I, S>(match_group_ids: I) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    aggregate(match_group_ids, AggregateFunction::Range)
}

pub fn count<I, S>(match_group_ids: I) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    aggregate(match_group_ids, AggregateFunction::Count)
}

pub fn custom_aggregate<I, S>(match_group_ids: I, function: AggregateFn) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    aggregate(match_group_ids, AggregateFunction::Custom(function))
}

fn group_value_processor<I, S>(match_group_ids: I, adjust: GroupValueAdjust) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PropertyDefinition::GroupValueProcessor(GroupValueProcessorDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        match_group_ids: match_group_ids.into_iter().map(Into::into).collect(),
        adjust,
    })
}

pub fn normalise_group_to<I, S>(
    match_group_ids: I,
    normalise_to: f64,
    mode: NormaliseMode,
) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    group_value_processor(match_group_ids, GroupValueAdjust::Normalise { normalise_to, mode })
}

pub fn accumulate_group<I, S>(
    match_group_ids: I,
    mode: AccumulateMode,
    separate_negative: bool,
) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    group_value_processor(
        match_group_ids,
        GroupValueAdjust::Accumulate {
            mode,
            separate_negative,
        },
    )
}

pub fn custom_group_value_processor<I, S, F>(match_group_ids: I, factory: F) -> PropertyDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn() -> GroupValueAdjustFn + Send + Sync + 'static,
{
    let factory: Arc<dyn Fn() -> GroupValueAdjustFn + Send + Sync> = Arc::new(factory);
    group_value_processor(
        match_group_ids,
        GroupValueAdjust::Custom(SharedFn::from_arc(factory)),
    )
}

pub fn normalise_property_to<S: Into<String>>(
    property: S,
    normalise_to: [f64; 2],
    zero_domain: f64,
    range_min: Option<f64>,
    range_max: Option<f64>,
) -> PropertyDefinition {
    PropertyDefinition::PropertyValueProcessor(PropertyValueProcessorDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        property: property.into(),
        adjust: PropertyAdjust::Normalise {
            normalise_to,
            zero_domain,
            range_min,
            range_max,
        },
    })
}

pub fn custom_property_value_processor<S: Into<String>>(
    property: S,
    adjust: PropertyAdjustFn,
) -> PropertyDefinition {
    PropertyDefinition::PropertyValueProcessor(PropertyValueProcessorDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        property: property.into(),
        adjust: PropertyAdjust::Custom(adjust),
    })
}

pub fn reducer<S, F>(property: S, initial_value: Datum, factory: F) -> PropertyDefinition
where
    S: Into<String>,
    F: Fn() -> ReducerFn + Send + Sync + 'static,
{
    let factory: Arc<dyn Fn() -> ReducerFn + Send + Sync> = Arc::new(factory);
    PropertyDefinition::Reducer(ReducerDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        property: property.into(),
        initial_value,
        reducer: SharedFn::from_arc(factory),
    })
}

fn key_interval_reducer(property: &str, smallest: bool) -> PropertyDefinition {
    let initial = if smallest {
        f64::INFINITY
    } else {
        f64::NEG_INFINITY
    };
    reducer(property, Datum::Number(initial), move || -> ReducerFn {
        let mut prev_key = f64::NAN;
        Box::new(move |acc: Datum, next: &DatumView<'_>| {
            let next_key = next
                .keys
                .first()
                .and_then(Datum::as_f64)
                .unwrap_or(f64::NAN);
            let interval = (next_key - prev_key).abs();
            prev_key = next_key;
            let so_far = acc.as_f64().unwrap_or(initial);
            let better = if smallest {
                interval < so_far
            } else {
                interval > so_far
            };
            if !interval.is_nan() && interval > 0.0 && better {
                Datum::Number(interval)
            } else {
                acc
            }
        })
    })
}

lazy_static! {
    static ref SMALLEST_KEY_INTERVAL_DEF: PropertyDefinition =
        key_interval_reducer(SMALLEST_KEY_INTERVAL, true);
    static ref LARGEST_KEY_INTERVAL_DEF: PropertyDefinition =
        key_interval_reducer(LARGEST_KEY_INTERVAL, false);
}

/// Smallest non-zero gap between the first key of consecutive groups or rows
pub fn smallest_key_interval() -> PropertyDefinition {
    SMALLEST_KEY_INTERVAL_DEF.clone()
}

/// Largest gap between the first key of consecutive groups or rows
pub fn largest_key_interval() -> PropertyDefinition {
    LARGEST_KEY_INTERVAL_DEF.clone()
}

fn processor(property: &str, calculate: ProcessorKind) -> PropertyDefinition {
    PropertyDefinition::Processor(ProcessorDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        property: property.to_string(),
        calculate,
    })
}

pub fn sort_domain_groups() -> PropertyDefinition {
    processor(SORTED_GROUP_DOMAIN, ProcessorKind::SortDomainGroups)
}

pub fn animation_validation(value_ids: Option<Vec<String>>) -> PropertyDefinition {
    processor(
        ANIMATION_VALIDATION,
        ProcessorKind::AnimationValidation { value_ids },
    )
}

pub fn diff(previous: Option<Arc<ProcessedData>>, update_moved_data: bool) -> PropertyDefinition {
    processor(
        DIFF,
        ProcessorKind::Diff {
            previous,
            update_moved_data,
        },
    )
}

pub fn custom_processor<S: Into<String>>(property: S, calculate: ProcessorFn) -> PropertyDefinition {
    PropertyDefinition::Processor(ProcessorDefinition {
        id: None,
        scopes: Vec::new(),
        ids_map: Default::default(),
        property: property.into(),
        calculate: ProcessorKind::Custom(calculate),
    })
}

impl PropertyDefinition {
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        *self.id_mut() = Some(id.into());
        self
    }

    pub fn with_scope<S: Into<String>>(mut self, scope: S) -> Self {
        let scope = scope.into();
        let scopes = self.scopes_mut();
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
        self
    }

    // The methods below only apply to key and value definitions

    pub fn with_group_id<S: Into<String>>(mut self, group_id: S) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.group_id = Some(group_id.into());
        }
        self
    }

    pub fn with_validation<F>(self, validation: F) -> Self
    where
        F: Fn(&Datum, &Datum) -> bool + Send + Sync + 'static,
    {
        self.with_validation_fn(validation_fn(validation))
    }

    pub fn with_validation_fn(mut self, validation: ValidationFn) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.validation = Some(validation);
        }
        self
    }

    pub fn with_invalid_value<D: Into<Datum>>(mut self, invalid_value: D) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.invalid_value = Some(invalid_value.into());
        }
        self
    }

    pub fn with_missing_value<D: Into<Datum>>(mut self, missing_value: D) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.missing_value = Some(missing_value.into());
        }
        self
    }

    pub fn with_force_value(mut self, force_value: f64) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.force_value = Some(force_value);
        }
        self
    }

    pub fn with_processor(mut self, processor: ValueProcessorFactory) -> Self {
        if let Some(def) = self.as_datum_mut() {
            def.processor = Some(processor);
        }
        self
    }
}
