use crate::controller::{DataResult, ResultSender};
use chartdata_common::data::datum::Records;
use chartdata_common::error::{ChartDataError, DuplicateResult, Result};
use chartdata_core::model::options::DataModelOptions;
use chartdata_core::spec::equality::{props_equal, props_fingerprint};
use chartdata_core::spec::property::PropertyDefinition;
use std::sync::Arc;

/// A registered request waiting for `execute`
pub(crate) struct PendingRequest {
    pub id: String,
    pub data: Records,
    pub options: DataModelOptions,
    pub sender: ResultSender,
}

impl PendingRequest {
    pub fn reject(self, err: ChartDataError) {
        if self.sender.send(Err(err)).is_err() {
            log::debug!("request {} was dropped before it was rejected", self.id);
        }
    }
}

/// Compatible requests sharing one data model run
pub(crate) struct MergedRequest {
    pub ids: Vec<String>,
    pub data: Records,
    pub options: DataModelOptions,
    /// Structural hash of the merged property list, scopes included
    pub fingerprint: u64,
    senders: Vec<(String, ResultSender)>,
}

impl MergedRequest {
    fn new(request: PendingRequest) -> Self {
        let PendingRequest {
            id,
            data,
            mut options,
            sender,
        } = request;
        options.props = scoped_props(&id, std::mem::take(&mut options.props));
        Self {
            ids: vec![id.clone()],
            data,
            options,
            fingerprint: 0,
            senders: vec![(id, sender)],
        }
    }

    fn accepts(&self, request: &PendingRequest) -> bool {
        let (ours, theirs) = (&self.options, &request.options);
        let same_data =
            Arc::ptr_eq(&self.data, &request.data) || (!ours.group_by_data && !theirs.group_by_data);
        same_data
            && ours.group_by_keys == theirs.group_by_keys
            && ours.group_by_fn == theirs.group_by_fn
            && ours.suppress_field_dot_notation == theirs.suppress_field_dot_notation
            && keys_equal(&ours.props, &theirs.props)
    }

    fn merge(&mut self, request: PendingRequest) {
        let PendingRequest {
            id,
            options,
            sender,
            ..
        } = request;
        for prop in scoped_props(&id, options.props) {
            match self
                .options
                .props
                .iter_mut()
                .find(|existing| props_equal(existing, &prop))
            {
                Some(existing) => merge_scopes(existing, prop),
                None => self.options.props.push(prop),
            }
        }
        self.ids.push(id.clone());
        self.senders.push((id, sender));
    }

    /// Hand every member the same outcome
    pub fn settle(self, result: &Result<DataResult>) {
        for (id, sender) in self.senders {
            if sender.send(result.duplicate()).is_err() {
                log::debug!("request {id} was dropped before it was settled");
            }
        }
    }
}

fn keys_equal(a: &[PropertyDefinition], b: &[PropertyDefinition]) -> bool {
    let a = a.iter().filter(|prop| prop.is_key()).collect::<Vec<_>>();
    let b = b.iter().filter(|prop| prop.is_key()).collect::<Vec<_>>();
    a.len() == b.len() && a.iter().zip(&b).all(|(a, b)| props_equal(a, b))
}

/// Tag every definition with the request it came from. A definition's own id
/// moves into `ids_map` under that request so that lookups stay per-request once
/// the definition is shared.
fn scoped_props(scope: &str, props: Vec<PropertyDefinition>) -> Vec<PropertyDefinition> {
    props
        .into_iter()
        .map(|mut prop| {
            if let Some(id) = prop.id_mut().take() {
                prop.ids_map_mut()
                    .entry(scope.to_string())
                    .or_default()
                    .insert(id);
            }
            let scopes = prop.scopes_mut();
            if !scopes.iter().any(|s| s == scope) {
                scopes.push(scope.to_string());
            }
            prop
        })
        .collect()
}

fn merge_scopes(existing: &mut PropertyDefinition, prop: PropertyDefinition) {
    for scope in prop.scopes() {
        if !existing.scopes().contains(scope) {
            existing.scopes_mut().push(scope.clone());
        }
    }
    for (scope, ids) in prop.ids_map() {
        existing
            .ids_map_mut()
            .entry(scope.clone())
            .or_default()
            .extend(ids.iter().cloned());
    }
}

/// Reject `group_by_data: false` requests whose rows cannot line up positionally
/// with the first request of the cycle.
pub(crate) fn validate_requests(
    requests: Vec<PendingRequest>,
) -> (Vec<PendingRequest>, Vec<String>) {
    let expected = requests.first().map(|first| first.data.len()).unwrap_or_default();
    let mut accepted = Vec::with_capacity(requests.len());
    let mut rejected = Vec::new();
    for request in requests {
        if !request.options.group_by_data && request.data.len() != expected {
            log::warn!(
                "request {} has {} rows, expected {} to match the first request",
                request.id,
                request.data.len(),
                expected
            );
            rejected.push(request.id.clone());
            let message = format!(
                "data for request [{}] has {} rows but the first request of the cycle has {}",
                request.id,
                request.data.len(),
                expected
            );
            request.reject(ChartDataError::request(message));
            continue;
        }
        accepted.push(request);
    }
    (accepted, rejected)
}

/// Combine compatible requests into batches, preserving registration order
pub(crate) fn merge_requests(requests: Vec<PendingRequest>) -> Vec<MergedRequest> {
    let mut batches: Vec<MergedRequest> = Vec::new();
    for request in requests {
        match batches.iter_mut().find(|batch| batch.accepts(&request)) {
            Some(batch) => batch.merge(request),
            None => batches.push(MergedRequest::new(request)),
        }
    }
    for batch in &mut batches {
        batch.fingerprint = props_fingerprint(&batch.options.props, true);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdata_common::data::datum::Datum;
    use chartdata_core::spec::builders::{key_property, sum, value_property};
    use chartdata_core::spec::property::ValueType;
    use futures::channel::oneshot;

    fn pending(id: &str, data: &Records, props: Vec<PropertyDefinition>) -> PendingRequest {
        let (sender, _) = oneshot::channel();
        PendingRequest {
            id: id.to_string(),
            data: data.clone(),
            options: DataModelOptions::new(props),
            sender,
        }
    }

    fn series_props() -> Vec<PropertyDefinition> {
        vec![
            key_property("x", ValueType::Category).with_id("xValue"),
            value_property("y", ValueType::Range)
                .with_id("yValue")
                .with_group_id("stack"),
        ]
    }

    #[test]
    fn test_identical_props_collapse() {
        let data: Records = Arc::new(vec![Datum::Null]);
        let batches = merge_requests(vec![
            pending("a", &data, series_props()),
            pending("b", &data, series_props()),
        ]);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.ids, vec!["a", "b"]);
        assert_eq!(batch.options.props.len(), 2);
        let y = &batch.options.props[1];
        assert_eq!(y.scopes(), &["a".to_string(), "b".to_string()]);
        assert!(y.matches_id("a", "yValue"));
        assert!(y.matches_id("b", "yValue"));
        assert!(!y.matches_id("c", "yValue"));
    }

    #[test]
    fn test_distinct_values_are_appended() {
        let data: Records = Arc::new(vec![Datum::Null]);
        let mut other = series_props();
        other[1] = value_property("z", ValueType::Range)
            .with_id("yValue")
            .with_group_id("stack");
        other.push(sum(["stack"]));
        let batches = merge_requests(vec![
            pending("a", &data, series_props()),
            pending("b", &data, other),
        ]);
        assert_eq!(batches.len(), 1);
        let props = &batches[0].options.props;
        assert_eq!(props.len(), 4);
        assert!(props[1].matches_id("a", "yValue"));
        assert!(!props[1].matches_id("b", "yValue"));
        assert!(props[2].matches_id("b", "yValue"));
    }

    #[test]
    fn test_different_data_or_keys_do_not_merge() {
        let first: Records = Arc::new(vec![Datum::Null]);
        let second: Records = Arc::new(vec![Datum::Null]);
        let mut other_keys = series_props();
        other_keys[0] = key_property("w", ValueType::Category);
        let batches = merge_requests(vec![
            pending("a", &first, series_props()),
            pending("b", &second, series_props()),
            pending("c", &first, other_keys),
        ]);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_ungrouped_length_mismatch_is_rejected() {
        let two: Records = Arc::new(vec![Datum::Null, Datum::Null]);
        let three: Records = Arc::new(vec![Datum::Null, Datum::Null, Datum::Null]);
        let mut first = pending("a", &two, series_props());
        first.options.group_by_data = false;
        let mut second = pending("b", &three, series_props());
        second.options.group_by_data = false;
        let third = pending("c", &three, series_props());
        let (accepted, rejected) = validate_requests(vec![first, second, third]);
        assert_eq!(
            accepted.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(rejected, vec!["b".to_string()]);
    }

    #[test]
    fn test_ungrouped_length_follows_first_request() {
        let three: Records = Arc::new(vec![Datum::Null, Datum::Null, Datum::Null]);
        let one: Records = Arc::new(vec![Datum::Null]);
        let grouped = pending("grouped", &three, series_props());
        let mut short = pending("short", &one, series_props());
        short.options.group_by_data = false;
        let mut aligned = pending("aligned", &three, series_props());
        aligned.options.group_by_data = false;
        let other = pending("other", &one, series_props());
        let (accepted, rejected) = validate_requests(vec![grouped, short, aligned, other]);
        assert_eq!(
            accepted.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["grouped", "aligned", "other"]
        );
        assert_eq!(rejected, vec!["short".to_string()]);
    }
}
