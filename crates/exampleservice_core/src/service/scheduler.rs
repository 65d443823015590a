//! Change-driven policy scheduler.
//!
//! # Responsibility
//! - Drain store change notifications and invoke the matching policy entry.
//! - Finalize parent deletion after the delete policy succeeded.
//! - Record failures per resource instead of aborting the drain.
//!
//! # Invariants
//! - Events are handled one at a time, so at most one reconciliation per
//!   parent runs at any moment.
//! - Events for purged parents are skipped.
//! - A failed delete policy leaves the tombstoned parent in place so the next
//!   `reconcile_all` retries it.

use crate::model::instance::ServiceInstance;
use crate::model::ResourceId;
use crate::service::policy::{PolicyError, ReconcileOutcome, ReconciliationPolicy};
use crate::store::resource_store::{ChangeEvent, ChangeKind, ResourceStore, StoreError};
use log::{debug, warn};
use std::sync::mpsc::Receiver;

/// One policy failure recorded against a parent.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub instance_id: ResourceId,
    pub change: ChangeKind,
    pub error: PolicyError,
}

/// Summary of one scheduler pass.
#[derive(Debug, Default)]
pub struct SchedulerReport {
    /// Events or instances handled, skipped ones excluded.
    pub handled: usize,
    pub skipped: usize,
    pub purged: Vec<ResourceId>,
    pub outcomes: Vec<(ResourceId, ReconcileOutcome)>,
    pub failures: Vec<ReconcileFailure>,
}

impl SchedulerReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures that need operator action rather than a retry.
    pub fn standing_failures(&self) -> impl Iterator<Item = &ReconcileFailure> {
        self.failures
            .iter()
            .filter(|failure| failure.error.is_configuration_error())
    }

    /// Folds a later pass into this one, keeping pass order.
    pub fn merge(&mut self, later: SchedulerReport) {
        self.handled += later.handled;
        self.skipped += later.skipped;
        self.purged.extend(later.purged);
        self.outcomes.extend(later.outcomes);
        self.failures.extend(later.failures);
    }
}

/// Scheduler owning the policy and the store's change feed.
pub struct PolicyScheduler<S: ResourceStore> {
    policy: ReconciliationPolicy<S>,
    changes: Receiver<ChangeEvent>,
}

impl<S: ResourceStore> PolicyScheduler<S> {
    pub fn new(policy: ReconciliationPolicy<S>, changes: Receiver<ChangeEvent>) -> Self {
        Self { policy, changes }
    }

    pub fn policy(&self) -> &ReconciliationPolicy<S> {
        &self.policy
    }

    /// Handles every queued change, including the ones emitted while
    /// handling earlier changes, until the feed is empty.
    pub fn run_pending(&self) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        while let Ok(change) = self.changes.try_recv() {
            self.handle_change(change, &mut report);
        }
        report
    }

    /// Reconciles every stored parent, tombstoned ones through the delete
    /// path. Changes emitted by these writes stay queued for `run_pending`.
    pub fn reconcile_all(&self) -> Result<SchedulerReport, StoreError> {
        let mut report = SchedulerReport::default();
        for instance in self.policy.store().list_service_instances(true)? {
            let change = if instance.is_deleted {
                ChangeKind::Deleted
            } else {
                ChangeKind::Updated
            };
            self.dispatch(instance, change, &mut report);
        }
        Ok(report)
    }

    fn handle_change(&self, change: ChangeEvent, report: &mut SchedulerReport) {
        let instance = match self
            .policy
            .store()
            .get_service_instance(change.instance_id, true)
        {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                debug!(
                    "event=scheduler_skip module=scheduler reason=purged instance_id={} change={}",
                    change.instance_id,
                    change.kind.as_str()
                );
                report.skipped += 1;
                return;
            }
            Err(err) => {
                report.failures.push(ReconcileFailure {
                    instance_id: change.instance_id,
                    change: change.kind,
                    error: PolicyError::Store(err),
                });
                return;
            }
        };
        self.dispatch(instance, change.kind, report);
    }

    fn dispatch(
        &self,
        mut instance: ServiceInstance,
        change: ChangeKind,
        report: &mut SchedulerReport,
    ) {
        let Some(instance_id) = instance.id else {
            return;
        };
        report.handled += 1;

        let result = if instance.is_deleted {
            self.policy
                .handle_delete(&mut instance)
                .and_then(|outcome| {
                    self.policy.store().purge_service_instance(instance_id)?;
                    report.purged.push(instance_id);
                    Ok(outcome)
                })
        } else if change == ChangeKind::Created {
            self.policy.handle_create(&mut instance)
        } else {
            self.policy.handle_update(&mut instance)
        };

        match result {
            Ok(outcome) => report.outcomes.push((instance_id, outcome)),
            Err(error) => {
                warn!(
                    "event=scheduler_failure module=scheduler status=error instance_id={} change={} error_code={} standing={}",
                    instance_id,
                    change.as_str(),
                    error.code(),
                    error.is_configuration_error()
                );
                report.failures.push(ReconcileFailure {
                    instance_id,
                    change,
                    error,
                });
            }
        }
    }
}
