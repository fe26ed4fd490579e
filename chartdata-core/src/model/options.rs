use crate::model::processed::ProcessedData;
use crate::spec::function::SharedFn;
use crate::spec::property::PropertyDefinition;
use chartdata_common::data::datum::Datum;
use std::sync::Arc;

/// One extracted row as seen by a grouping function
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub index: usize,
    pub keys: &'a [Datum],
    pub values: &'a [Datum],
    pub datum: &'a Datum,
}

/// Maps a row to the bucket key of the group it belongs to
pub type GroupBucketFn = Box<dyn Fn(&RowView<'_>) -> Vec<Datum> + Send + Sync>;

/// Given the ungrouped data, produces the per-row bucket function
pub type GroupByFn = SharedFn<dyn Fn(&ProcessedData) -> GroupBucketFn + Send + Sync>;

pub fn group_by_fn<F>(f: F) -> GroupByFn
where
    F: Fn(&ProcessedData) -> GroupBucketFn + Send + Sync + 'static,
{
    let f: Arc<dyn Fn(&ProcessedData) -> GroupBucketFn + Send + Sync> = Arc::new(f);
    SharedFn::from_arc(f)
}

#[derive(Debug, Clone)]
pub struct DataModelOptions {
    pub props: Vec<PropertyDefinition>,
    /// Group rows that share the same key tuple
    pub group_by_keys: bool,
    /// Custom grouping, takes precedence over `group_by_keys`
    pub group_by_fn: Option<GroupByFn>,
    /// When false the request's rows are aligned positionally with every other
    /// request that also declares `group_by_data: false`
    pub group_by_data: bool,
    /// Treat dots in property names literally instead of as nested lookups
    pub suppress_field_dot_notation: bool,
}

impl Default for DataModelOptions {
    fn default() -> Self {
        Self {
            props: Vec::new(),
            group_by_keys: false,
            group_by_fn: None,
            group_by_data: true,
            suppress_field_dot_notation: false,
        }
    }
}

impl DataModelOptions {
    pub fn new(props: Vec<PropertyDefinition>) -> Self {
        Self {
            props,
            ..Default::default()
        }
    }

    pub fn with_group_by_keys(mut self, group_by_keys: bool) -> Self {
        self.group_by_keys = group_by_keys;
        self
    }

    pub fn with_group_by_fn(mut self, group_by_fn: GroupByFn) -> Self {
        self.group_by_fn = Some(group_by_fn);
        self
    }

    pub fn with_group_by_data(mut self, group_by_data: bool) -> Self {
        self.group_by_data = group_by_data;
        self
    }

    pub fn with_suppress_field_dot_notation(mut self, suppress: bool) -> Self {
        self.suppress_field_dot_notation = suppress;
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by_keys || self.group_by_fn.is_some()
    }
}
