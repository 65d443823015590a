//! Inbound change-event dispatcher.
//!
//! # Responsibility
//! - Decode `SimpleExampleEvent` payloads.
//! - Write the new tenant message onto every matching parent instance.
//!
//! # Invariants
//! - Never invokes the reconciliation policy. The touched save is observed by
//!   the store's change feed, which schedules reconciliation.
//! - Malformed payloads and unknown names are reported, never dropped.

use crate::model::instance::ServiceInstance;
use crate::store::resource_store::{ResourceStore, SaveOptions, StoreError};
use log::{error, info, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Bus topic carrying tenant message changes.
pub const EVENT_TOPIC: &str = "SimpleExampleEvent";

/// Decoded event payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExampleEvent {
    /// Name of the target parent instance.
    pub service_instance: String,
    pub tenant_message: String,
}

/// Dispatcher error.
#[derive(Debug)]
pub enum EventError {
    /// Payload is not `{service_instance, tenant_message}` JSON.
    Malformed(serde_json::Error),
    /// No live parent instance carries the requested name.
    NotFound(String),
    /// Store read/write failure.
    Store(StoreError),
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed {EVENT_TOPIC} payload: {err}"),
            Self::NotFound(name) => {
                write!(f, "failed to find service instance `{name}`")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<StoreError> for EventError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Event step bound to one resource store.
pub struct ExampleEventStep<S: ResourceStore> {
    store: S,
}

impl<S: ResourceStore> ExampleEventStep<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn topic(&self) -> &'static str {
        EVENT_TOPIC
    }

    /// Decodes and applies one raw event payload.
    ///
    /// Returns the number of parent instances updated.
    pub fn process_event(&self, raw: &str) -> Result<usize, EventError> {
        let started_at = Instant::now();
        let event: ExampleEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(err) => {
                error!(
                    "event=event_process module=event status=error error_code=malformed topic={} error={}",
                    EVENT_TOPIC, err
                );
                return Err(EventError::Malformed(err));
            }
        };

        match self.apply(&event) {
            Ok(updated) => {
                info!(
                    "event=event_process module=event status=ok topic={} updated={} duration_ms={}",
                    EVENT_TOPIC,
                    updated,
                    started_at.elapsed().as_millis()
                );
                Ok(updated)
            }
            Err(err) => {
                error!(
                    "event=event_process module=event status=error topic={} error={}",
                    EVENT_TOPIC, err
                );
                Err(err)
            }
        }
    }

    /// Applies an already decoded event.
    pub fn apply(&self, event: &ExampleEvent) -> Result<usize, EventError> {
        let matches = self.store.find_service_instances(&event.service_instance)?;
        if matches.is_empty() {
            return Err(EventError::NotFound(event.service_instance.clone()));
        }
        if matches.len() > 1 {
            warn!(
                "event=event_process module=event status=duplicate_name matches={}",
                matches.len()
            );
        }

        let count = matches.len();
        for mut instance in matches {
            instance.tenant_message = event.tenant_message.clone();
            self.store.save_service_instance(
                &instance,
                &SaveOptions {
                    always_update_timestamp: true,
                    update_fields: Some(vec![ServiceInstance::FIELD_TENANT_MESSAGE]),
                },
            )?;
        }
        Ok(count)
    }
}
