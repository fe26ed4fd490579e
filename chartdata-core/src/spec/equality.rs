//! Structural comparison of property definitions.
//!
//! Bookkeeping fields (`id`, `ids_map`, `scopes`) are ignored, so two series asking for
//! the same computed column compare equal even though each tracks its own ids.
use crate::spec::property::{
    AggregateFunction, DatumPropertyDefinition, GroupValueAdjust, ProcessorKind, PropertyAdjust,
    PropertyDefinition,
};
use ahash::RandomState;
use chartdata_common::data::datum::Datum;
use chartdata_common::data::key::DatumKey;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

pub fn props_equal(a: &PropertyDefinition, b: &PropertyDefinition) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    use PropertyDefinition::*;
    match (a, b) {
        (Key(a), Key(b)) | (Value(a), Value(b)) => datum_props_equal(a, b),
        (Aggregate(a), Aggregate(b)) => {
            a.match_group_ids == b.match_group_ids
                && match (&a.function, &b.function) {
                    (AggregateFunction::Sum, AggregateFunction::Sum)
                    | (AggregateFunction::Range, AggregateFunction::Range)
                    | (AggregateFunction::Count, AggregateFunction::Count) => true,
                    (AggregateFunction::Custom(a), AggregateFunction::Custom(b)) => a == b,
                    _ => false,
                }
        }
        (GroupValueProcessor(a), GroupValueProcessor(b)) => {
            a.match_group_ids == b.match_group_ids
                && match (&a.adjust, &b.adjust) {
                    (
                        GroupValueAdjust::Normalise {
                            normalise_to: a_to,
                            mode: a_mode,
                        },
                        GroupValueAdjust::Normalise {
                            normalise_to: b_to,
                            mode: b_mode,
                        },
                    ) => a_to == b_to && a_mode == b_mode,
                    (
                        GroupValueAdjust::Accumulate {
                            mode: a_mode,
                            separate_negative: a_sep,
                        },
                        GroupValueAdjust::Accumulate {
                            mode: b_mode,
                            separate_negative: b_sep,
                        },
                    ) => a_mode == b_mode && a_sep == b_sep,
                    (GroupValueAdjust::Custom(a), GroupValueAdjust::Custom(b)) => a == b,
                    _ => false,
                }
        }
        (PropertyValueProcessor(a), PropertyValueProcessor(b)) => {
            a.property == b.property
                && match (&a.adjust, &b.adjust) {
                    (
                        PropertyAdjust::Normalise {
                            normalise_to: a_to,
                            zero_domain: a_zero,
                            range_min: a_min,
                            range_max: a_max,
                        },
                        PropertyAdjust::Normalise {
                            normalise_to: b_to,
                            zero_domain: b_zero,
                            range_min: b_min,
                            range_max: b_max,
                        },
                    ) => a_to == b_to && a_zero == b_zero && a_min == b_min && a_max == b_max,
                    (PropertyAdjust::Custom(a), PropertyAdjust::Custom(b)) => a == b,
                    _ => false,
                }
        }
        (Reducer(a), Reducer(b)) => {
            a.property == b.property
                && a.reducer == b.reducer
                && a.initial_value == b.initial_value
        }
        (Processor(a), Processor(b)) => {
            a.property == b.property
                && match (&a.calculate, &b.calculate) {
                    (ProcessorKind::SortDomainGroups, ProcessorKind::SortDomainGroups) => true,
                    (
                        ProcessorKind::AnimationValidation { value_ids: a },
                        ProcessorKind::AnimationValidation { value_ids: b },
                    ) => a == b,
                    (
                        ProcessorKind::Diff {
                            previous: a_prev,
                            update_moved_data: a_moved,
                        },
                        ProcessorKind::Diff {
                            previous: b_prev,
                            update_moved_data: b_moved,
                        },
                    ) => {
                        a_moved == b_moved
                            && match (a_prev, b_prev) {
                                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                                (None, None) => true,
                                _ => false,
                            }
                    }
                    (ProcessorKind::Custom(a), ProcessorKind::Custom(b)) => a == b,
                    _ => false,
                }
        }
        _ => false,
    }
}

fn datum_props_equal(a: &DatumPropertyDefinition, b: &DatumPropertyDefinition) -> bool {
    a.property == b.property
        && a.value_type == b.value_type
        && a.group_id == b.group_id
        && a.validation == b.validation
        && a.processor == b.processor
        && a.force_value == b.force_value
        && optional_datum_equal(&a.invalid_value, &b.invalid_value)
        && optional_datum_equal(&a.missing_value, &b.missing_value)
}

// Substitutes are compared by key so that two `NaN` substitutes count as the same setting
fn optional_datum_equal(a: &Option<Datum>, b: &Option<Datum>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => DatumKey::from(a) == DatumKey::from(b),
        (None, None) => true,
        _ => false,
    }
}

// Fixed seeds keep fingerprints stable across controllers in one process
const FINGERPRINT_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Structural hash of a property list, consistent with [`props_equal`].
///
/// When `include_scopes` is set the scope and id bookkeeping is hashed too, which
/// is what a cache lookup needs since merged columns differ by their requesters.
pub fn props_fingerprint(props: &[PropertyDefinition], include_scopes: bool) -> u64 {
    let mut hasher = RandomState::with_seeds(
        FINGERPRINT_SEEDS[0],
        FINGERPRINT_SEEDS[1],
        FINGERPRINT_SEEDS[2],
        FINGERPRINT_SEEDS[3],
    )
    .build_hasher();
    props.len().hash(&mut hasher);
    for prop in props {
        hash_prop(prop, include_scopes, &mut hasher);
    }
    hasher.finish()
}

fn hash_prop<H: Hasher>(prop: &PropertyDefinition, include_scopes: bool, state: &mut H) {
    prop.type_name().hash(state);
    if include_scopes {
        prop.id().hash(state);
        prop.scopes().hash(state);
        prop.ids_map().hash(state);
    }
    match prop {
        PropertyDefinition::Key(def) | PropertyDefinition::Value(def) => {
            def.property.hash(state);
            def.value_type.hash(state);
            def.group_id.hash(state);
            def.validation.hash(state);
            def.processor.hash(state);
            def.force_value.map(f64::to_bits).hash(state);
            def.invalid_value.as_ref().map(DatumKey::from).hash(state);
            def.missing_value.as_ref().map(DatumKey::from).hash(state);
        }
        PropertyDefinition::Aggregate(def) => {
            def.match_group_ids.hash(state);
            match &def.function {
                AggregateFunction::Sum => 0u8.hash(state),
                AggregateFunction::Range => 1u8.hash(state),
                AggregateFunction::Count => 2u8.hash(state),
                AggregateFunction::Custom(f) => f.hash(state),
            }
        }
        PropertyDefinition::GroupValueProcessor(def) => {
            def.match_group_ids.hash(state);
            match &def.adjust {
                GroupValueAdjust::Normalise { normalise_to, mode } => {
                    normalise_to.to_bits().hash(state);
                    mode.hash(state);
                }
                GroupValueAdjust::Accumulate {
                    mode,
                    separate_negative,
                } => {
                    mode.hash(state);
                    separate_negative.hash(state);
                }
                GroupValueAdjust::Custom(f) => f.hash(state),
            }
        }
        PropertyDefinition::PropertyValueProcessor(def) => {
            def.property.hash(state);
            match &def.adjust {
                PropertyAdjust::Normalise {
                    normalise_to,
                    zero_domain,
                    range_min,
                    range_max,
                } => {
                    normalise_to.map(f64::to_bits).hash(state);
                    zero_domain.to_bits().hash(state);
                    range_min.map(f64::to_bits).hash(state);
                    range_max.map(f64::to_bits).hash(state);
                }
                PropertyAdjust::Custom(f) => f.hash(state),
            }
        }
        PropertyDefinition::Reducer(def) => {
            def.property.hash(state);
            def.reducer.hash(state);
            DatumKey::from(&def.initial_value).hash(state);
        }
        PropertyDefinition::Processor(def) => {
            def.property.hash(state);
            match &def.calculate {
                ProcessorKind::SortDomainGroups => {}
                ProcessorKind::AnimationValidation { value_ids } => value_ids.hash(state),
                ProcessorKind::Diff {
                    previous,
                    update_moved_data,
                } => {
                    previous.as_ref().map(|p| Arc::as_ptr(p) as usize).hash(state);
                    update_moved_data.hash(state);
                }
                ProcessorKind::Custom(f) => f.hash(state),
            }
        }
    }
}
