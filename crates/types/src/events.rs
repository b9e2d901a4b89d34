//! Append-only event buffer standing in for the host ledger's event log.

use crate::units::Height;
use serde::{Deserialize, Serialize};

/// One emitted event together with the height it was emitted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    pub height: Height,
    pub event: E,
}

/// Events emitted by a component, drained by the host for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog<E> {
    records: Vec<EventRecord<E>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<E> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, height: Height, event: E) {
        self.records.push(EventRecord { height, event });
    }

    /// Take every buffered event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<EventRecord<E>> {
        std::mem::take(&mut self.records)
    }

    pub fn records(&self) -> &[EventRecord<E>] {
        &self.records
    }

    pub fn last(&self) -> Option<&E> {
        self.records.last().map(|record| &record.event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
