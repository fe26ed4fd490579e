use chartdata_core::model::processed::ProcessedData;
use std::fmt;

/// Snapshot of one controller phase
#[derive(Debug, Clone, Copy)]
pub enum DebugEvent<'a> {
    /// Ids of every registered request, in registration order
    Requested { ids: &'a [String] },
    /// Requests that passed validation, and those rejected
    Validated {
        accepted: &'a [String],
        rejected: &'a [String],
    },
    /// Request ids of each merged batch
    Merged { batches: &'a [Vec<String>] },
    Processed {
        ids: &'a [String],
        reused: bool,
        processed: &'a ProcessedData,
    },
}

impl fmt::Display for DebugEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugEvent::Requested { ids } => write!(f, "requested: {ids:?}"),
            DebugEvent::Validated { accepted, rejected } => {
                write!(f, "validated: {accepted:?}, rejected: {rejected:?}")
            }
            DebugEvent::Merged { batches } => write!(f, "merged: {batches:?}"),
            DebugEvent::Processed {
                ids,
                reused,
                processed,
            } => write!(
                f,
                "processed {ids:?} ({}): {} of {} rows kept, {} groups, {:?}",
                if *reused { "reused" } else { "computed" },
                processed.len(),
                processed.input_len,
                processed.groups.len(),
                processed.time
            ),
        }
    }
}

/// Receives controller snapshots for diagnostics
pub trait DataDebugSink: Send + Sync {
    fn event(&self, event: &DebugEvent<'_>);
}

/// Writes every event to the log at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDebugSink;

impl DataDebugSink for LogDebugSink {
    fn event(&self, event: &DebugEvent<'_>) {
        log::debug!("{event}");
    }
}
