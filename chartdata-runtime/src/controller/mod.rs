//! Per draw-cycle coordination of data model runs.
//!
//! Series register requests with [`DataController::request`] and await the returned
//! handles. Nothing is computed until [`DataController::execute`], which merges
//! compatible requests, reuses unchanged batches from the previous cycle's
//! [`DataCache`], and resolves every handle before returning.
pub mod cache;
mod merge;

use crate::config::DataControllerConfig;
use crate::debug::{DataDebugSink, DebugEvent, LogDebugSink};
use chartdata_common::data::datum::Records;
use chartdata_common::error::{ChartDataError, Result, ResultWithContext};
use chartdata_core::model::data_model::DataModel;
use chartdata_core::model::options::DataModelOptions;
use chartdata_core::model::processed::ProcessedData;
use futures::channel::oneshot;
use merge::{merge_requests, validate_requests, MergedRequest, PendingRequest};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub use cache::DataCache;

/// What every member of a batch receives
#[derive(Debug, Clone)]
pub struct DataResult {
    pub data_model: Arc<DataModel>,
    pub processed_data: Arc<ProcessedData>,
}

type ResultSender = oneshot::Sender<Result<DataResult>>;

/// Resolves once the controller has executed
#[derive(Debug)]
pub struct DataRequestHandle {
    id: String,
    receiver: oneshot::Receiver<Result<DataResult>>,
}

impl DataRequestHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for DataRequestHandle {
    type Output = Result<DataResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id.clone();
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(ChartDataError::request(format!(
                    "request [{id}] was dropped before the controller executed"
                )))
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Setup,
    Executed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Batches that ran a new data model
    pub computed: usize,
    /// Batches served from the previous cache
    pub reused: usize,
    /// Batches whose data model failed
    pub failed: usize,
}

pub struct DataController {
    state: ControllerState,
    requested: Vec<PendingRequest>,
    debug: Option<Arc<dyn DataDebugSink>>,
    stats: ControllerStats,
}

impl Default for DataController {
    fn default() -> Self {
        Self::new()
    }
}

impl DataController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Setup,
            requested: Vec::new(),
            debug: None,
            stats: Default::default(),
        }
    }

    pub fn with_config(config: &DataControllerConfig) -> Self {
        let controller = Self::new();
        if config.debug {
            controller.with_debug_sink(Arc::new(LogDebugSink))
        } else {
            controller
        }
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DataDebugSink>) -> Self {
        self.debug = Some(sink);
        self
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn is_executed(&self) -> bool {
        self.state == ControllerState::Executed
    }

    /// Register a request. Fails once the controller has executed.
    pub fn request<S: Into<String>>(
        &mut self,
        id: S,
        data: Records,
        options: DataModelOptions,
    ) -> Result<DataRequestHandle> {
        let id = id.into();
        if self.is_executed() {
            return Err(ChartDataError::request(format!(
                "request [{id}] made after the data controller executed"
            )));
        }
        let (sender, receiver) = oneshot::channel();
        self.requested.push(PendingRequest {
            id: id.clone(),
            data,
            options,
            sender,
        });
        Ok(DataRequestHandle { id, receiver })
    }

    /// Run every registered request and resolve their handles.
    ///
    /// Batch failures reject that batch's requests only; the returned error is
    /// reserved for misuse of the controller itself.
    pub fn execute(&mut self, previous: Option<&DataCache>) -> Result<DataCache> {
        if self.is_executed() {
            return Err(ChartDataError::request(
                "data controller has already executed",
            ));
        }
        self.state = ControllerState::Executed;
        let requested = std::mem::take(&mut self.requested);

        if let Some(debug) = &self.debug {
            let ids = requested.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
            debug.event(&DebugEvent::Requested { ids: &ids });
        }

        let (valid, rejected) = validate_requests(requested);
        if let Some(debug) = &self.debug {
            let accepted = valid.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
            debug.event(&DebugEvent::Validated {
                accepted: &accepted,
                rejected: &rejected,
            });
        }

        let batches = merge_requests(valid);
        if let Some(debug) = &self.debug {
            let ids = batches.iter().map(|b| b.ids.clone()).collect::<Vec<_>>();
            debug.event(&DebugEvent::Merged { batches: &ids });
        }

        let mut cache = DataCache::new();
        for batch in batches {
            let reused = previous.and_then(|previous| previous.find(&batch)).cloned();
            let is_reused = reused.is_some();
            let result = match reused {
                Some(result) => {
                    self.stats.reused += 1;
                    Ok(result)
                }
                None => run_batch(&batch),
            };
            match &result {
                Ok(result) => {
                    if !is_reused {
                        self.stats.computed += 1;
                    }
                    if let Some(debug) = &self.debug {
                        debug.event(&DebugEvent::Processed {
                            ids: &batch.ids,
                            reused: is_reused,
                            processed: &result.processed_data,
                        });
                    }
                    cache.insert(&batch, result.clone());
                }
                Err(err) => {
                    self.stats.failed += 1;
                    log::error!("data model for requests {:?} failed: {err}", batch.ids);
                }
            }
            batch.settle(&result);
        }
        Ok(cache)
    }
}

fn run_batch(batch: &MergedRequest) -> Result<DataResult> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<DataResult> {
        let data_model = DataModel::try_new(batch.options.clone())?;
        let processed_data = data_model.process_data(&batch.data)?;
        Ok(DataResult {
            data_model: Arc::new(data_model),
            processed_data: Arc::new(processed_data),
        })
    }));
    let ids = &batch.ids;
    outcome
        .ok()
        .with_context(|| format!("panic while processing data for requests {ids:?}"))?
        .with_context(|| format!("Processing data for requests {ids:?}"))
}
