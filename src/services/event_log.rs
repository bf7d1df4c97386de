// src/services/event_log.rs
//! Event sinks used by the service.
//!
//! [`EventLog`] keeps a bounded window of recent registry events for the
//! `/events` endpoint and mirrors each one to the `log` facade, so an operator
//! tailing the process output sees every state transition.

use crate::models::event::{EventSink, RegistryEvent};
use crate::utils::serialization::serialize;
use log::{info, warn};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded in-memory event history.
pub struct EventLog {
    events: Mutex<VecDeque<RegistryEvent>>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log retaining at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventLog {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Most recent events, newest first.
    pub fn recent(&self, count: usize) -> Vec<RegistryEvent> {
        match self.events.lock() {
            Ok(events) => events.iter().rev().take(count).cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().rev().take(count).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map_or(0, |events| events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: RegistryEvent) {
        LogSink.emit(event.clone());

        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => {
                warn!("event log lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if events.len() == self.capacity {
            events.pop_front(); // evict oldest
        }
        events.push_back(event);
    }
}

/// Writes events to the `log` facade only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: RegistryEvent) {
        match serialize(&event) {
            Ok(json) => info!("EVENT [{}] {}", event.label(), json),
            Err(e) => warn!("EVENT [{}] could not be encoded: {}", event.label(), e),
        }
    }
}
