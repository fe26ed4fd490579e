use crate::domain::Domain;
use crate::spec::property::DatumPropertyDefinition;
use crate::transform::diff::ProcessedDataDiff;
use crate::transform::process::AnimationValidation;
use chartdata_common::data::datum::Datum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedDataKind {
    Ungrouped,
    Grouped,
}

/// A key or value definition together with where its data ended up
#[derive(Debug, Clone)]
pub struct ResolvedDatumDef {
    /// Position in `ProcessedData::keys` or `ProcessedData::columns`
    pub index: usize,
    pub def: DatumPropertyDefinition,
    /// Set when some record lacked the field and no substitute was configured
    pub missing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessedDefs {
    pub keys: Vec<ResolvedDatumDef>,
    pub values: Vec<ResolvedDatumDef>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessedDomain {
    pub keys: Vec<Domain>,
    pub values: Vec<Domain>,
    /// Bucket keys of every group, in group order
    pub groups: Option<Vec<Vec<Datum>>>,
    /// One `[min, max]` per aggregate definition across all groups
    pub agg_values: Vec<Domain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataGroup {
    pub keys: Vec<Datum>,
    /// Rows of the ungrouped arrays that belong to this group
    pub datum_indices: Vec<usize>,
    /// One pair per aggregate definition
    pub aggregation: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReducedValue {
    Datum(Datum),
    Groups(Vec<Vec<Datum>>),
    AnimationValidation(AnimationValidation),
    Diff(ProcessedDataDiff),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWarningKind {
    InvalidValue,
    MissingValue,
}

/// Per-run data quality finding, reported once per definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataWarning {
    pub kind: DataWarningKind,
    pub scopes: Vec<String>,
    pub property: String,
    pub id: Option<String>,
    /// The first offending value, as text
    pub value: Option<String>,
    /// Number of rows the finding applied to
    pub count: usize,
}

impl DataWarning {
    fn same_source(&self, other: &DataWarning) -> bool {
        self.kind == other.kind
            && self.property == other.property
            && self.id == other.id
            && self.scopes == other.scopes
    }
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.as_deref().unwrap_or(&self.property);
        let scope = if self.scopes.is_empty() {
            String::new()
        } else {
            format!("[{}] ", self.scopes.join(", "))
        };
        match self.kind {
            DataWarningKind::InvalidValue => write!(
                f,
                "{scope}invalid value of type [{}] for [{id}] ignored: [{}]",
                self.property,
                self.value.as_deref().unwrap_or("undefined")
            ),
            DataWarningKind::MissingValue => write!(
                f,
                "{scope}the key [{}] was not found in at least one data element",
                self.property
            ),
        }
    }
}

/// Output of one data model run
#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub kind: ProcessedDataKind,
    /// Number of records before validation
    pub input_len: usize,
    /// Records that passed validation, in input order
    pub raw_data: Vec<Datum>,
    /// One array per key definition, aligned with `raw_data`
    pub keys: Vec<Vec<Datum>>,
    /// One array per value definition, aligned with `raw_data`
    pub columns: Vec<Vec<Datum>>,
    pub domain: ProcessedDomain,
    pub defs: ProcessedDefs,
    /// Empty unless grouped
    pub groups: Vec<DataGroup>,
    /// Ungrouped data with aggregates gets one aggregation list per row
    pub row_aggregation: Vec<Vec<[f64; 2]>>,
    pub reduced: BTreeMap<String, ReducedValue>,
    pub invalid_count: usize,
    pub warnings: Vec<DataWarning>,
    pub time: Duration,
}

impl ProcessedData {
    pub(crate) fn new(kind: ProcessedDataKind, input_len: usize, defs: ProcessedDefs) -> Self {
        Self {
            kind,
            input_len,
            raw_data: Vec::new(),
            keys: vec![Vec::new(); defs.keys.len()],
            columns: vec![Vec::new(); defs.values.len()],
            domain: Default::default(),
            defs,
            groups: Vec::new(),
            row_aggregation: Vec::new(),
            reduced: Default::default(),
            invalid_count: 0,
            warnings: Vec::new(),
            time: Duration::default(),
        }
    }

    /// Number of rows that passed validation
    pub fn len(&self) -> usize {
        self.raw_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_data.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.kind == ProcessedDataKind::Grouped
    }

    /// Groups in grouped mode, rows otherwise
    pub fn unit_count(&self) -> usize {
        match self.kind {
            ProcessedDataKind::Grouped => self.groups.len(),
            ProcessedDataKind::Ungrouped => self.raw_data.len(),
        }
    }

    pub fn row_keys(&self, row: usize) -> Vec<Datum> {
        self.keys.iter().map(|column| column[row].clone()).collect()
    }

    pub fn row_values(&self, row: usize) -> Vec<Datum> {
        self.columns.iter().map(|column| column[row].clone()).collect()
    }

    /// Keys of a group (grouped mode) or a row
    pub fn unit_keys(&self, unit: usize) -> Vec<Datum> {
        match self.kind {
            ProcessedDataKind::Grouped => self.groups[unit].keys.clone(),
            ProcessedDataKind::Ungrouped => self.row_keys(unit),
        }
    }

    /// Row indices covered by a group (grouped mode) or a row
    pub fn unit_datum_indices(&self, unit: usize) -> Vec<usize> {
        match self.kind {
            ProcessedDataKind::Grouped => self.groups[unit].datum_indices.clone(),
            ProcessedDataKind::Ungrouped => vec![unit],
        }
    }

    pub fn unit_aggregation(&self, unit: usize) -> &[[f64; 2]] {
        match self.kind {
            ProcessedDataKind::Grouped => &self.groups[unit].aggregation,
            ProcessedDataKind::Ungrouped => self
                .row_aggregation
                .get(unit)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub fn reduced_datum(&self, name: &str) -> Option<&Datum> {
        match self.reduced.get(name) {
            Some(ReducedValue::Datum(datum)) => Some(datum),
            _ => None,
        }
    }

    pub fn reduced_groups(&self, name: &str) -> Option<&[Vec<Datum>]> {
        match self.reduced.get(name) {
            Some(ReducedValue::Groups(groups)) => Some(groups),
            _ => None,
        }
    }

    pub fn reduced_diff(&self, name: &str) -> Option<&ProcessedDataDiff> {
        match self.reduced.get(name) {
            Some(ReducedValue::Diff(diff)) => Some(diff),
            _ => None,
        }
    }

    pub fn reduced_animation_validation(&self, name: &str) -> Option<&AnimationValidation> {
        match self.reduced.get(name) {
            Some(ReducedValue::AnimationValidation(validation)) => Some(validation),
            _ => None,
        }
    }

    /// Record a warning, folding repeats from the same definition into the first one
    pub(crate) fn push_warning(&mut self, warning: DataWarning) {
        match self.warnings.iter_mut().find(|w| w.same_source(&warning)) {
            Some(existing) => existing.count += warning.count,
            None => self.warnings.push(warning),
        }
    }

    /// Emit the collected warnings through the log facade
    pub(crate) fn log_warnings(&self) {
        for warning in &self.warnings {
            if warning.count > 1 {
                log::warn!("{warning} ({} rows)", warning.count);
            } else {
                log::warn!("{warning}");
            }
        }
    }
}
