use chartdata_runtime::debug::{DataDebugSink, DebugEvent};
use std::sync::Mutex;

/// Debug sink that records the rendered events
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<String>>,
}

impl DataDebugSink for RecordingSink {
    fn event(&self, event: &DebugEvent<'_>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.to_string());
        }
    }
}
