//! Reconciliation policy for service instances.
//!
//! # Responsibility
//! - Provision a workload, its config artifact and its secret artifact the
//!   first time a parent instance is reconciled.
//! - Keep the config artifact equal to the rendered page afterwards, writing
//!   only when the rendered payload diverges.
//! - Tear the workload down when the parent is deleted.
//!
//! # Invariants
//! - `ServiceInstance.compute_instance_id` is the only "already provisioned"
//!   check; no secondary lookup for existing workloads is made.
//! - First provisioning writes in this order: workload (`no_sync = true`),
//!   config artifact, config mount, secret artifact, secret mount, workload
//!   `no_sync = false`, parent reference. The parent reference is last, so a
//!   failure anywhere before it leaves the parent unprovisioned.
//! - A steady-state reconcile whose render equals the stored payload issues
//!   no writes at all.
//! - The held `PolicyConfig` has passed `validate()`.
//! - Errors abort the invocation and propagate unchanged; nothing is rolled
//!   back and nothing is retried here.

use crate::config::{ConfigError, PolicyConfig};
use crate::model::artifact::{ConfigArtifact, ConfigMount, SecretArtifact, SecretMount};
use crate::model::compute::WorkloadInstance;
use crate::model::instance::{ExampleService, ServiceInstance};
use crate::model::ResourceId;
use crate::service::render::{
    render_config_data, render_index, render_secret_data, IndexFields, IndexImage,
};
use crate::store::resource_store::{
    persisted_id, ResourceKind, ResourceStore, SaveOptions, StoreError,
};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Reconciliation failure.
///
/// Every variant except `Store` is a configuration or invariant problem that
/// a retry will not fix.
#[derive(Debug)]
pub enum PolicyError {
    /// No compute provider is registered.
    MissingComputeService,
    /// The compute provider has no workload class.
    MissingInstanceClass { compute_service_id: ResourceId },
    /// The parent references an owning service that does not exist.
    MissingOwner {
        instance_id: ResourceId,
        owner_id: ResourceId,
    },
    /// The owning service has no slice to provision into.
    NoSlice { service_id: ResourceId },
    /// The slice has no usable default image.
    NoDefaultImage { slice_id: ResourceId },
    /// The parent references a workload that does not exist.
    MissingWorkload {
        instance_id: ResourceId,
        workload_id: ResourceId,
    },
    /// The workload does not carry exactly one config mount.
    MountCardinality {
        workload_id: ResourceId,
        found: usize,
    },
    /// A mount points at an artifact that does not exist.
    MissingArtifact {
        kind: ResourceKind,
        id: ResourceId,
    },
    /// Store read/write failure.
    Store(StoreError),
}

impl PolicyError {
    /// Returns whether retrying cannot succeed without operator action.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingComputeService => "missing_compute_service",
            Self::MissingInstanceClass { .. } => "missing_instance_class",
            Self::MissingOwner { .. } => "missing_owner",
            Self::NoSlice { .. } => "no_slice",
            Self::NoDefaultImage { .. } => "no_default_image",
            Self::MissingWorkload { .. } => "missing_workload",
            Self::MountCardinality { .. } => "mount_cardinality",
            Self::MissingArtifact { .. } => "missing_artifact",
            Self::Store(_) => "store_error",
        }
    }
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingComputeService => write!(f, "no compute service is registered"),
            Self::MissingInstanceClass { compute_service_id } => write!(
                f,
                "compute service {compute_service_id} has no service instance class"
            ),
            Self::MissingOwner {
                instance_id,
                owner_id,
            } => write!(
                f,
                "service instance {instance_id} references missing owner {owner_id}"
            ),
            Self::NoSlice { service_id } => write!(f, "service {service_id} has no slices"),
            Self::NoDefaultImage { slice_id } => {
                write!(f, "slice {slice_id} has no default image")
            }
            Self::MissingWorkload {
                instance_id,
                workload_id,
            } => write!(
                f,
                "service instance {instance_id} references missing workload {workload_id}"
            ),
            Self::MountCardinality { workload_id, found } => write!(
                f,
                "workload {workload_id} has {found} config mounts, expected exactly 1"
            ),
            Self::MissingArtifact { kind, id } => write!(f, "{kind} {id} is missing"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PolicyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for PolicyError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// What one policy invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First reconcile created the workload graph.
    Provisioned { workload_id: ResourceId },
    /// Rendered payload diverged and was rewritten.
    ConfigUpdated { workload_id: ResourceId },
    /// Rendered payload matched; nothing was written.
    Unchanged { workload_id: ResourceId },
    /// Workload deleted and parent reference cleared.
    Deprovisioned { workload_id: ResourceId },
    /// Delete requested on a parent that was never provisioned.
    NothingToDelete,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioned { .. } => "provisioned",
            Self::ConfigUpdated { .. } => "config_updated",
            Self::Unchanged { .. } => "unchanged",
            Self::Deprovisioned { .. } => "deprovisioned",
            Self::NothingToDelete => "nothing_to_delete",
        }
    }
}

/// Reconciliation policy bound to one resource store.
pub struct ReconciliationPolicy<S: ResourceStore> {
    store: S,
    config: PolicyConfig,
}

impl<S: ResourceStore> ReconciliationPolicy<S> {
    /// Creates a policy with explicit store and naming configuration.
    ///
    /// Rejects a config that would fail validation partway through
    /// provisioning, before any reconcile can write.
    pub fn new(store: S, config: PolicyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Entry point for a newly created parent. Same semantics as update.
    pub fn handle_create(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        self.observe("create", instance.id, || self.reconcile(instance))
    }

    /// Entry point for a modified parent.
    pub fn handle_update(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        self.observe("update", instance.id, || self.reconcile(instance))
    }

    /// Entry point for a parent being deleted.
    ///
    /// The caller finalizes removal of the parent record afterwards.
    pub fn handle_delete(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        self.observe("delete", instance.id, || self.deprovision(instance))
    }

    /// Renders the landing page for the parent's current state.
    pub fn render_index(&self, instance: &ServiceInstance) -> PolicyResult<String> {
        let service = self.owner_of(instance)?;
        Ok(render_index(&self.index_fields(instance, &service)?))
    }

    /// Returns the config artifact payload the parent should have right now.
    pub fn desired_config_data(&self, instance: &ServiceInstance) -> PolicyResult<String> {
        let service = self.owner_of(instance)?;
        self.config_data_for(instance, &service)
    }

    fn reconcile(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        match instance.compute_instance_id {
            None => self.provision(instance),
            Some(workload_id) => self.refresh_config(instance, workload_id),
        }
    }

    fn provision(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        let instance_id = persisted_id(ResourceKind::ServiceInstance, instance.id)?;

        let compute_service = self
            .store
            .first_compute_service()?
            .ok_or(PolicyError::MissingComputeService)?;
        let compute_service_id = persisted_id(ResourceKind::ComputeService, compute_service.id)?;
        let class = self
            .store
            .service_instance_class(compute_service_id)?
            .ok_or(PolicyError::MissingInstanceClass { compute_service_id })?;

        let service = self.owner_of(instance)?;
        let service_id = persisted_id(ResourceKind::ExampleService, service.id)?;
        let slice = self
            .store
            .slices_of(service_id)?
            .into_iter()
            .next()
            .ok_or(PolicyError::NoSlice { service_id })?;
        let slice_id = persisted_id(ResourceKind::Slice, slice.id)?;
        let image_id = slice
            .default_image_id
            .ok_or(PolicyError::NoDefaultImage { slice_id })?;
        let image = self
            .store
            .get_image(image_id)?
            .ok_or(PolicyError::NoDefaultImage { slice_id })?;

        let mut workload = WorkloadInstance::new(
            self.config.workload_name(instance_id),
            compute_service_id,
            slice_id,
            image_id,
            class,
        );
        workload.no_sync = true;
        let workload_id = self.store.create_workload(&mut workload)?;
        debug!(
            "event=workload_create module=policy status=ok instance_id={} workload_id={} image={}:{}",
            instance_id, workload_id, image.name, image.tag
        );

        let mut config = ConfigArtifact::new(
            self.config.config_name(instance_id),
            slice.trust_domain_id,
            self.config_data_for(instance, &service)?,
        );
        let config_id = self.store.create_config_artifact(&mut config)?;
        let mut config_mount = ConfigMount::new(
            config_id,
            workload_id,
            self.config.config_mount_path.as_str(),
        );
        self.store.create_config_mount(&mut config_mount)?;

        let mut secret = SecretArtifact::new(
            self.config.secret_name(instance_id),
            slice.trust_domain_id,
            render_secret_data(&service.service_secret, &instance.tenant_secret),
        );
        let secret_id = self.store.create_secret_artifact(&mut secret)?;
        let mut secret_mount = SecretMount::new(
            secret_id,
            workload_id,
            self.config.secret_mount_path.as_str(),
        );
        self.store.create_secret_mount(&mut secret_mount)?;

        workload.no_sync = false;
        self.store.save_workload(
            &workload,
            &SaveOptions::only(&[WorkloadInstance::FIELD_NO_SYNC]),
        )?;

        instance.compute_instance_id = Some(workload_id);
        self.store.save_service_instance(
            instance,
            &SaveOptions::only(&[ServiceInstance::FIELD_COMPUTE_INSTANCE]),
        )?;

        Ok(ReconcileOutcome::Provisioned { workload_id })
    }

    fn refresh_config(
        &self,
        instance: &ServiceInstance,
        workload_id: ResourceId,
    ) -> PolicyResult<ReconcileOutcome> {
        let instance_id = persisted_id(ResourceKind::ServiceInstance, instance.id)?;
        let workload = self
            .store
            .get_workload(workload_id)?
            .ok_or(PolicyError::MissingWorkload {
                instance_id,
                workload_id,
            })?;

        let mounts = self.store.config_mounts(workload_id)?;
        let [mount] = mounts.as_slice() else {
            return Err(PolicyError::MountCardinality {
                workload_id,
                found: mounts.len(),
            });
        };
        let mut config = self.store.get_config_artifact(mount.config_id)?.ok_or(
            PolicyError::MissingArtifact {
                kind: ResourceKind::ConfigArtifact,
                id: mount.config_id,
            },
        )?;

        let desired = self.desired_config_data(instance)?;
        if desired == config.data {
            return Ok(ReconcileOutcome::Unchanged { workload_id });
        }

        config.data = desired;
        self.store
            .save_config_artifact(&config, &SaveOptions::touched())?;
        // Downstream materializers watch the workload, not the artifact.
        self.store.save_workload(&workload, &SaveOptions::touched())?;

        Ok(ReconcileOutcome::ConfigUpdated { workload_id })
    }

    fn deprovision(&self, instance: &mut ServiceInstance) -> PolicyResult<ReconcileOutcome> {
        let Some(workload_id) = instance.compute_instance_id else {
            return Ok(ReconcileOutcome::NothingToDelete);
        };

        self.store.delete_workload(workload_id)?;
        instance.compute_instance_id = None;
        self.store.save_service_instance(
            instance,
            &SaveOptions::only(&[ServiceInstance::FIELD_COMPUTE_INSTANCE]),
        )?;

        Ok(ReconcileOutcome::Deprovisioned { workload_id })
    }

    fn owner_of(&self, instance: &ServiceInstance) -> PolicyResult<ExampleService> {
        let instance_id = persisted_id(ResourceKind::ServiceInstance, instance.id)?;
        self.store
            .get_example_service(instance.owner_id)?
            .ok_or(PolicyError::MissingOwner {
                instance_id,
                owner_id: instance.owner_id,
            })
    }

    fn config_data_for(
        &self,
        instance: &ServiceInstance,
        service: &ExampleService,
    ) -> PolicyResult<String> {
        let fields = self.index_fields(instance, service)?;
        Ok(render_config_data(&fields, &self.config.index_file_name))
    }

    fn index_fields(
        &self,
        instance: &ServiceInstance,
        service: &ExampleService,
    ) -> PolicyResult<IndexFields> {
        let instance_id = persisted_id(ResourceKind::ServiceInstance, instance.id)?;
        let mut fields = IndexFields::new(
            instance.tenant_message.as_str(),
            service.service_message.as_str(),
        );
        fields.foreground_color = self.color_code(instance.foreground_color_id)?;
        fields.background_color = self.color_code(instance.background_color_id)?;
        fields.images = self
            .store
            .embedded_images(instance_id)?
            .into_iter()
            .map(|image| IndexImage {
                name: image.name,
                url: image.url,
            })
            .collect();
        Ok(fields)
    }

    fn color_code(&self, color_id: Option<ResourceId>) -> PolicyResult<Option<String>> {
        let Some(color_id) = color_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .get_color(color_id)?
            .map(|color| color.html_code))
    }

    fn observe(
        &self,
        operation: &'static str,
        instance_id: Option<ResourceId>,
        run: impl FnOnce() -> PolicyResult<ReconcileOutcome>,
    ) -> PolicyResult<ReconcileOutcome> {
        let started_at = Instant::now();
        let instance_label = instance_id.map_or_else(|| "unsaved".to_string(), |id| id.to_string());
        let result = run();
        match &result {
            Ok(outcome) => info!(
                "event=policy_{operation} module=policy status=ok instance_id={} outcome={} duration_ms={}",
                instance_label,
                outcome.as_str(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=policy_{operation} module=policy status=error instance_id={} error_code={} configuration_error={} duration_ms={} error={}",
                instance_label,
                err.code(),
                err.is_configuration_error(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}
