use crate::controller::merge::MergedRequest;
use crate::controller::DataResult;
use chartdata_common::data::datum::Records;
use chartdata_core::model::options::DataModelOptions;
use chartdata_core::spec::equality::props_equal;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CachedBatch {
    ids: Vec<String>,
    data: Records,
    options: DataModelOptions,
    fingerprint: u64,
    result: DataResult,
}

impl CachedBatch {
    fn matches(&self, batch: &MergedRequest) -> bool {
        self.fingerprint == batch.fingerprint
            && Arc::ptr_eq(&self.data, &batch.data)
            && self.ids == batch.ids
            && options_equal(&self.options, &batch.options)
    }
}

/// Structural equality including the per-request bookkeeping that `props_equal`
/// leaves out.
fn options_equal(a: &DataModelOptions, b: &DataModelOptions) -> bool {
    a.group_by_keys == b.group_by_keys
        && a.group_by_fn == b.group_by_fn
        && a.group_by_data == b.group_by_data
        && a.suppress_field_dot_notation == b.suppress_field_dot_notation
        && a.props.len() == b.props.len()
        && a.props.iter().zip(&b.props).all(|(a, b)| {
            props_equal(a, b)
                && a.id() == b.id()
                && a.scopes() == b.scopes()
                && a.ids_map() == b.ids_map()
        })
}

/// Results of one `execute` call, handed back to the next one.
///
/// Entries share their data model and processed data with the results already
/// delivered to requests, so a returned cache must be treated as read only.
#[derive(Debug, Clone, Default)]
pub struct DataCache {
    batches: Vec<CachedBatch>,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Results stored for `ids`, the request ids of one batch in registration order
    pub fn get(&self, ids: &[String]) -> Option<&DataResult> {
        self.batches
            .iter()
            .find(|cached| cached.ids == ids)
            .map(|cached| &cached.result)
    }

    pub(crate) fn find(&self, batch: &MergedRequest) -> Option<&DataResult> {
        self.batches
            .iter()
            .find(|cached| cached.matches(batch))
            .map(|cached| &cached.result)
    }

    pub(crate) fn insert(&mut self, batch: &MergedRequest, result: DataResult) {
        self.batches.push(CachedBatch {
            ids: batch.ids.clone(),
            data: batch.data.clone(),
            options: batch.options.clone(),
            fingerprint: batch.fingerprint,
            result,
        });
    }
}
