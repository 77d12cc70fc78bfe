//! Event system for the build pipeline
//!
//! Fire-and-forget notifications to the rest of the build system.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Runtime event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ForgeEvent {
    /// A discovered plugin was instantiated successfully
    PluginLoaded {
        name: String,
    },
    /// Fatal condition: the whole build must stop with the given code
    AllStop {
        exit_code: i32,
    },
}

/// Event sink trait for emitting events
pub trait EventSink: Send + Sync {
    /// Emit an event
    fn emit(&self, event: &ForgeEvent);
}

/// A simple logging event sink
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &ForgeEvent) {
        tracing::debug!("Event: {:?}", event);
    }
}

/// A buffering event sink that collects events
pub struct BufferingEventSink {
    events: Arc<RwLock<Vec<ForgeEvent>>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<ForgeEvent> {
        self.events.read().expect("event buffer poisoned").clone()
    }

    pub fn clear(&self) {
        self.events.write().expect("event buffer poisoned").clear();
    }
}

impl Default for BufferingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, event: &ForgeEvent) {
        self.events
            .write()
            .expect("event buffer poisoned")
            .push(event.clone());
    }
}
