//! Periodic sync steps.
//!
//! # Responsibility
//! - Define the hook a periodic synchronizer runs over observed records.
//!
//! # Invariants
//! - `SyncServiceInstanceStep` performs no writes. All derived state for a
//!   service instance is owned by the reconciliation policy.

use crate::model::instance::ServiceInstance;
use crate::store::resource_store::StoreResult;
use std::time::Duration;

/// One periodic step over a record family.
pub trait SyncStep {
    type Record;

    /// Record family this step observes, used in log lines.
    fn observes(&self) -> &'static str;

    /// Interval the host should wait between passes. `None` means every pass.
    fn requested_interval(&self) -> Option<Duration> {
        None
    }

    fn sync_record(&self, record: &Self::Record) -> StoreResult<()>;
}

/// No-op step for service instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncServiceInstanceStep;

impl SyncStep for SyncServiceInstanceStep {
    type Record = ServiceInstance;

    fn observes(&self) -> &'static str {
        "service_instance"
    }

    fn sync_record(&self, _record: &ServiceInstance) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncServiceInstanceStep, SyncStep};
    use crate::model::instance::ServiceInstance;

    #[test]
    fn service_instance_step_is_a_no_op() {
        let step = SyncServiceInstanceStep;
        let instance = ServiceInstance::new("tenant-a", 1, "world", "tenantsecret");
        assert_eq!(step.observes(), "service_instance");
        assert!(step.requested_interval().is_none());
        assert!(step.sync_record(&instance).is_ok());
    }
}
