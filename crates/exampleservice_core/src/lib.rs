//! Core reconciliation logic for the example service.
//! This crate owns the resource model, the store contract and the policy
//! that keeps each service instance's workload in sync.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, LoggingConfig, PolicyConfig, SyncConfig, CONFIG_PATH_ENV};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::artifact::{ConfigArtifact, ConfigMount, SecretArtifact, SecretMount};
pub use model::compute::{
    ComputeService, Image, InstanceClass, Slice, TrustDomain, WorkloadInstance,
};
pub use model::instance::{Color, EmbeddedImage, ExampleService, ServiceInstance};
pub use model::{ResourceId, ValidationError};
pub use service::event_step::{EventError, ExampleEvent, ExampleEventStep, EVENT_TOPIC};
pub use service::policy::{PolicyError, PolicyResult, ReconcileOutcome, ReconciliationPolicy};
pub use service::render::{render_index, IndexFields, IndexImage};
pub use service::scheduler::{PolicyScheduler, ReconcileFailure, SchedulerReport};
pub use service::sync_step::{SyncServiceInstanceStep, SyncStep};
pub use store::resource_store::{
    ChangeEvent, ChangeKind, ResourceKind, ResourceStore, SaveOptions, StoreError, StoreResult,
};
pub use store::sqlite_store::SqliteResourceStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
