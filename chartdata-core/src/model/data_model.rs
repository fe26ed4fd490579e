use crate::domain::{Domain, DomainTracker};
use crate::model::options::DataModelOptions;
use crate::model::processed::{
    DataWarning, DataWarningKind, ProcessedData, ProcessedDataKind, ProcessedDefs,
    ResolvedDatumDef,
};
use crate::spec::property::{
    DatumPropertyDefinition, ProcessorDefinition, PropertyDefinition, ReducerDefinition,
    ValueTransform,
};
use crate::transform::aggregate::{aggregate_data, aggregate_domains, ResolvedAggregate};
use crate::transform::group::group_data;
use crate::transform::normalise::{
    apply_group_processors, apply_property_processors, ResolvedGroupProcessor,
    ResolvedPropertyProcessor,
};
use crate::transform::process::post_process;
use crate::transform::reduce::reduce_data;
use chartdata_common::data::datum::Datum;
use chartdata_common::error::{ChartDataError, Result};
use chartdata_common::escape::split_field_path;
use itertools::Itertools;
use std::collections::HashSet;
use std::time::Instant;

/// Which part of the processed data an id resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    Key,
    Value,
    Aggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedIndex {
    pub kind: DomainKind,
    pub index: usize,
}

/// A key or value definition ready for extraction
#[derive(Debug, Clone)]
struct ExtractionDef {
    def: DatumPropertyDefinition,
    path: Vec<String>,
    /// Name the domain tracker knows this column by, unique within keys or values
    domain_name: String,
}

impl ExtractionDef {
    fn read(&self, datum: &Datum, missing: &mut bool) -> Datum {
        let value = match datum.get_path(self.path.as_slice()) {
            Some(value) => value.clone(),
            None => match &self.def.missing_value {
                Some(substitute) => substitute.clone(),
                None => {
                    *missing = true;
                    Datum::Undefined
                }
            },
        };
        match self.def.force_value {
            Some(force) if value.is_negative() => Datum::Number(-force),
            Some(force) => Datum::Number(force),
            None => value,
        }
    }
}

/// Extracts, validates, groups and aggregates record arrays according to a list of
/// property definitions.
#[derive(Debug, Clone)]
pub struct DataModel {
    options: DataModelOptions,
    keys: Vec<ExtractionDef>,
    values: Vec<ExtractionDef>,
    aggregates: Vec<ResolvedAggregate>,
    group_processors: Vec<ResolvedGroupProcessor>,
    property_processors: Vec<ResolvedPropertyProcessor>,
    reducers: Vec<ReducerDefinition>,
    processors: Vec<ProcessorDefinition>,
    has_validation: bool,
}

impl DataModel {
    pub fn try_new(options: DataModelOptions) -> Result<Self> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut aggregates = Vec::new();
        let mut group_processors = Vec::new();
        let mut property_processors = Vec::new();
        let mut reducers = Vec::new();
        let mut processors = Vec::new();

        for prop in &options.props {
            match prop {
                PropertyDefinition::Key(def) => {
                    if !values.is_empty() {
                        return Err(ChartDataError::configuration(format!(
                            "all key properties must precede value properties, found key [{}] after a value",
                            def.property
                        )));
                    }
                    keys.push(def.clone());
                }
                PropertyDefinition::Value(def) => values.push(def.clone()),
                PropertyDefinition::Aggregate(def) => aggregates.push(def.clone()),
                PropertyDefinition::GroupValueProcessor(def) => group_processors.push(def.clone()),
                PropertyDefinition::PropertyValueProcessor(def) => {
                    property_processors.push(def.clone())
                }
                PropertyDefinition::Reducer(def) => reducers.push(def.clone()),
                PropertyDefinition::Processor(def) => processors.push(def.clone()),
            }
        }

        if options.group_by_keys && options.group_by_fn.is_none() && keys.is_empty() {
            return Err(ChartDataError::configuration(
                "grouping by keys requires at least one key property",
            ));
        }

        let aggregates = aggregates
            .into_iter()
            .map(|def| {
                let columns = matching_group_columns(&values, &def.match_group_ids, "aggregate")?;
                Ok(ResolvedAggregate { def, columns })
            })
            .collect::<Result<Vec<_>>>()?;

        let group_processors = group_processors
            .into_iter()
            .map(|def| {
                let columns = matching_group_columns(
                    &values,
                    &def.match_group_ids,
                    "group-value-processor",
                )?;
                Ok(ResolvedGroupProcessor { def, columns })
            })
            .collect::<Result<Vec<_>>>()?;

        let property_processors = property_processors
            .into_iter()
            .map(|def| {
                let columns = values
                    .iter()
                    .positions(|value| value.property == def.property)
                    .collect::<Vec<_>>();
                if columns.is_empty() {
                    return Err(ChartDataError::configuration(format!(
                        "no value property matches property-value-processor for [{}]",
                        def.property
                    )));
                }
                Ok(ResolvedPropertyProcessor { def, columns })
            })
            .collect::<Result<Vec<_>>>()?;

        let has_validation = keys
            .iter()
            .chain(values.iter())
            .any(|def| def.validation.is_some());

        let suppress_dots = options.suppress_field_dot_notation;
        Ok(Self {
            keys: extraction_defs(keys, suppress_dots),
            values: extraction_defs(values, suppress_dots),
            aggregates,
            group_processors,
            property_processors,
            reducers,
            processors,
            has_validation,
            options,
        })
    }

    pub fn options(&self) -> &DataModelOptions {
        &self.options
    }

    pub fn is_grouped(&self) -> bool {
        self.options.is_grouped()
    }

    pub fn key_defs(&self) -> impl Iterator<Item = &DatumPropertyDefinition> {
        self.keys.iter().map(|k| &k.def)
    }

    pub fn value_defs(&self) -> impl Iterator<Item = &DatumPropertyDefinition> {
        self.values.iter().map(|v| &v.def)
    }

    /// Run every stage over `data`.
    ///
    /// Stages run in a fixed order: extraction, grouping, aggregation, group value
    /// processors, property value processors, aggregate domains, reducers, processors.
    pub fn process_data(&self, data: &[Datum]) -> Result<ProcessedData> {
        let start = Instant::now();

        let mut processed = self.extract_data(data)?;
        if self.is_grouped() {
            group_data(&mut processed, self.options.group_by_fn.as_ref());
        }
        aggregate_data(&mut processed, &self.aggregates);
        apply_group_processors(&mut processed, &self.group_processors, &self.aggregates);
        apply_property_processors(&mut processed, &self.property_processors);
        aggregate_domains(&mut processed, self.aggregates.len());
        reduce_data(&mut processed, &self.reducers);
        post_process(&mut processed, &self.processors);
        self.warn_missing(&mut processed);

        processed.log_warnings();
        processed.time = start.elapsed();
        log::debug!(
            "processed {} of {} records in {:?}",
            processed.len(),
            processed.input_len,
            processed.time
        );
        Ok(processed)
    }

    fn extract_data(&self, data: &[Datum]) -> Result<ProcessedData> {
        let defs = ProcessedDefs {
            keys: resolved_defs(&self.keys),
            values: resolved_defs(&self.values),
        };
        let mut processed = ProcessedData::new(ProcessedDataKind::Ungrouped, data.len(), defs);

        let mut key_domains = DomainTracker::new();
        for key in &self.keys {
            key_domains.init(&key.domain_name, key.def.value_type);
        }
        let mut value_domains = DomainTracker::new();
        for value in &self.values {
            value_domains.init(&value.domain_name, value.def.value_type);
        }

        let mut key_transforms = transforms(&self.keys);
        let mut value_transforms = transforms(&self.values);
        let mut key_missing = vec![false; self.keys.len()];
        let mut value_missing = vec![false; self.values.len()];

        for datum in data {
            let mut keys = self
                .keys
                .iter()
                .zip(key_missing.iter_mut())
                .map(|(def, missing)| def.read(datum, missing))
                .collect::<Vec<_>>();
            let mut values = self
                .values
                .iter()
                .zip(value_missing.iter_mut())
                .map(|(def, missing)| def.read(datum, missing))
                .collect::<Vec<_>>();

            if self.has_validation
                && !(validate(&self.keys, &mut keys, datum, &mut processed)
                    && validate(&self.values, &mut values, datum, &mut processed))
            {
                processed.invalid_count += 1;
                continue;
            }

            for (i, key) in keys.into_iter().enumerate() {
                let key = apply_transform(&mut key_transforms[i], key);
                key_domains.observe(&self.keys[i].domain_name, &key);
                processed.keys[i].push(key);
            }
            for (i, value) in values.into_iter().enumerate() {
                let value = apply_transform(&mut value_transforms[i], value);
                value_domains.observe(&self.values[i].domain_name, &value);
                processed.columns[i].push(value);
            }
            processed.raw_data.push(datum.clone());
        }

        processed.domain.keys = read_domains(&self.keys, &key_domains)?;
        processed.domain.values = read_domains(&self.values, &value_domains)?;
        for (def, missing) in processed.defs.keys.iter_mut().zip(key_missing) {
            def.missing = missing;
        }
        for (def, missing) in processed.defs.values.iter_mut().zip(value_missing) {
            def.missing = missing;
        }
        Ok(processed)
    }

    fn warn_missing(&self, processed: &mut ProcessedData) {
        let missing = processed
            .defs
            .keys
            .iter()
            .chain(processed.defs.values.iter())
            .filter(|resolved| resolved.missing)
            .map(|resolved| DataWarning {
                kind: DataWarningKind::MissingValue,
                scopes: resolved.def.scopes.clone(),
                property: resolved.def.property.clone(),
                id: resolved.def.id.clone(),
                value: None,
                count: 1,
            })
            .collect::<Vec<_>>();
        for warning in missing {
            processed.push_warning(warning);
        }
    }

    /// First key, value or aggregate that answers to `id` in `scope`
    pub fn resolve_processed_data_index_by_id(&self, scope: &str, id: &str) -> Result<ResolvedIndex> {
        self.resolve_processed_data_indices_by_id(scope, id)
            .into_iter()
            .next()
            .ok_or_else(|| unknown_id(scope, id))
    }

    /// Every key, value and aggregate that answers to `id` in `scope`, in that order
    pub fn resolve_processed_data_indices_by_id(&self, scope: &str, id: &str) -> Vec<ResolvedIndex> {
        let keys = self
            .keys
            .iter()
            .positions(|k| k.def.matches_id(scope, id))
            .map(|index| ResolvedIndex {
                kind: DomainKind::Key,
                index,
            });
        let values = self
            .values
            .iter()
            .positions(|v| v.def.matches_id(scope, id))
            .map(|index| ResolvedIndex {
                kind: DomainKind::Value,
                index,
            });
        let aggregates = self
            .aggregates
            .iter()
            .positions(|a| a.def.matches_id(scope, id))
            .map(|index| ResolvedIndex {
                kind: DomainKind::Aggregate,
                index,
            });
        keys.chain(values).chain(aggregates).collect()
    }

    pub fn resolve_processed_data_def_by_id(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<&DatumPropertyDefinition> {
        match self.resolve_processed_data_index_by_id(scope, id)? {
            ResolvedIndex {
                kind: DomainKind::Key,
                index,
            } => Ok(&self.keys[index].def),
            ResolvedIndex {
                kind: DomainKind::Value,
                index,
            } => Ok(&self.values[index].def),
            ResolvedIndex {
                kind: DomainKind::Aggregate,
                ..
            } => Err(ChartDataError::internal(format!(
                "id [{id}] in scope [{scope}] refers to an aggregate, not a key or value"
            ))),
        }
    }

    /// Key array or value column of the definition answering to `id`
    pub fn resolve_column_by_id<'a>(
        &self,
        scope: &str,
        id: &str,
        processed: &'a ProcessedData,
    ) -> Result<&'a [Datum]> {
        let resolved = self.resolve_processed_data_index_by_id(scope, id)?;
        let column = match resolved.kind {
            DomainKind::Key => processed.keys.get(resolved.index),
            DomainKind::Value => processed.columns.get(resolved.index),
            DomainKind::Aggregate => None,
        };
        column
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_id(scope, id))
    }

    pub fn resolve_keys_by_id<'a>(
        &self,
        scope: &str,
        id: &str,
        processed: &'a ProcessedData,
    ) -> Result<&'a [Datum]> {
        let index = self
            .keys
            .iter()
            .position(|k| k.def.matches_id(scope, id))
            .ok_or_else(|| unknown_id(scope, id))?;
        processed
            .keys
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_id(scope, id))
    }

    /// Value column indices that feed `group_id`
    pub fn resolve_group_value_indices(&self, group_id: &str) -> Vec<usize> {
        self.values
            .iter()
            .positions(|v| v.def.group_id.as_deref() == Some(group_id))
            .collect()
    }

    pub fn get_domain(
        &self,
        scope: &str,
        id: &str,
        kind: DomainKind,
        processed: &ProcessedData,
    ) -> Result<Domain> {
        let index = self
            .resolve_processed_data_indices_by_id(scope, id)
            .into_iter()
            .find(|resolved| resolved.kind == kind)
            .ok_or_else(|| unknown_id(scope, id))?
            .index;
        let domains = match kind {
            DomainKind::Key => &processed.domain.keys,
            DomainKind::Value => &processed.domain.values,
            DomainKind::Aggregate => &processed.domain.agg_values,
        };
        domains
            .get(index)
            .cloned()
            .ok_or_else(|| unknown_id(scope, id))
    }
}

fn unknown_id(scope: &str, id: &str) -> ChartDataError {
    ChartDataError::internal(format!(
        "no property definition found for id [{id}] in scope [{scope}]"
    ))
}

fn matching_group_columns(
    values: &[DatumPropertyDefinition],
    match_group_ids: &[String],
    kind: &str,
) -> Result<Vec<usize>> {
    let columns = values
        .iter()
        .positions(|value| {
            value
                .group_id
                .as_ref()
                .map(|group_id| match_group_ids.contains(group_id))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    if columns.is_empty() {
        return Err(ChartDataError::configuration(format!(
            "no value property matches {kind} group ids [{}]",
            match_group_ids.join(", ")
        )));
    }
    Ok(columns)
}

fn extraction_defs(defs: Vec<DatumPropertyDefinition>, suppress_dots: bool) -> Vec<ExtractionDef> {
    let mut used_names = HashSet::new();
    defs.into_iter()
        .enumerate()
        .map(|(index, def)| {
            let path = if suppress_dots {
                vec![def.property.clone()]
            } else {
                split_field_path(&def.property)
            };
            let domain_name = if used_names.insert(def.property.clone()) {
                def.property.clone()
            } else {
                format!("{}#{index}", def.property)
            };
            ExtractionDef {
                def,
                path,
                domain_name,
            }
        })
        .collect()
}

fn resolved_defs(defs: &[ExtractionDef]) -> Vec<ResolvedDatumDef> {
    defs.iter()
        .enumerate()
        .map(|(index, extraction)| ResolvedDatumDef {
            index,
            def: extraction.def.clone(),
            missing: false,
        })
        .collect()
}

fn transforms(defs: &[ExtractionDef]) -> Vec<Option<ValueTransform>> {
    defs.iter()
        .map(|extraction| extraction.def.processor.as_ref().map(|factory| factory()))
        .collect()
}

fn apply_transform(transform: &mut Option<ValueTransform>, value: Datum) -> Datum {
    match transform {
        Some(transform) => transform(&value),
        None => value,
    }
}

/// Returns false when the row must be dropped
fn validate(
    defs: &[ExtractionDef],
    row: &mut [Datum],
    datum: &Datum,
    processed: &mut ProcessedData,
) -> bool {
    for (def, value) in defs.iter().map(|d| &d.def).zip(row.iter_mut()) {
        // Forced values are not subject to validation
        if def.force_value.is_some() {
            continue;
        }
        let Some(validation) = &def.validation else {
            continue;
        };
        if validation(&*value, datum) {
            continue;
        }
        match &def.invalid_value {
            Some(substitute) => *value = substitute.clone(),
            None => {
                processed.push_warning(DataWarning {
                    kind: DataWarningKind::InvalidValue,
                    scopes: def.scopes.clone(),
                    property: def.property.clone(),
                    id: def.id.clone(),
                    value: Some(value.to_string()),
                    count: 1,
                });
                return false;
            }
        }
    }
    true
}

fn read_domains(defs: &[ExtractionDef], tracker: &DomainTracker) -> Result<Vec<Domain>> {
    defs.iter()
        .map(|def| {
            tracker.read_domain(&def.domain_name).ok_or_else(|| {
                ChartDataError::internal(format!(
                    "domain for [{}] was not initialized",
                    def.domain_name
                ))
            })
        })
        .collect()
}
