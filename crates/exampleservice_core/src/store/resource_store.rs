//! Resource store contract consumed by the policy and the event dispatcher.
//!
//! # Responsibility
//! - Define typed read/traversal/write operations over the resource graph.
//! - Define save semantics (`SaveOptions`) shared by every backend.
//! - Define the change notification emitted when a parent instance is written.
//!
//! # Invariants
//! - Write paths validate records before persistence.
//! - `create_*` assigns the record id in place and returns it.
//! - Saves with `always_update_timestamp` strictly advance `updated_at`.

use crate::db::DbError;
use crate::model::artifact::{ConfigArtifact, ConfigMount, SecretArtifact, SecretMount};
use crate::model::compute::{ComputeService, Image, InstanceClass, Slice, WorkloadInstance};
use crate::model::instance::{Color, EmbeddedImage, ExampleService, ServiceInstance};
use crate::model::{ResourceId, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Record families known by the store, used in errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ServiceInstance,
    ExampleService,
    ComputeService,
    TrustDomain,
    Image,
    Slice,
    Color,
    EmbeddedImage,
    WorkloadInstance,
    ConfigArtifact,
    ConfigMount,
    SecretArtifact,
    SecretMount,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceInstance => "service_instance",
            Self::ExampleService => "example_service",
            Self::ComputeService => "compute_service",
            Self::TrustDomain => "trust_domain",
            Self::Image => "image",
            Self::Slice => "slice",
            Self::Color => "color",
            Self::EmbeddedImage => "embedded_image",
            Self::WorkloadInstance => "workload_instance",
            Self::ConfigArtifact => "config_artifact",
            Self::ConfigMount => "config_mount",
            Self::SecretArtifact => "secret_artifact",
            Self::SecretMount => "secret_mount",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store error for resource persistence and traversal.
#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        kind: ResourceKind,
        id: ResourceId,
    },
    /// A write needed the id of a record that was never created.
    NotPersisted(ResourceKind),
    /// `SaveOptions::only` named a column the record does not have.
    UnknownField {
        kind: ResourceKind,
        field: String,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::NotPersisted(kind) => write!(f, "{kind} has not been persisted yet"),
            Self::UnknownField { kind, field } => write!(f, "{kind} has no field `{field}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns the persisted id of a record or `NotPersisted`.
pub fn persisted_id(kind: ResourceKind, id: Option<ResourceId>) -> StoreResult<ResourceId> {
    id.ok_or(StoreError::NotPersisted(kind))
}

/// Options controlling one save call.
///
/// - `always_update_timestamp`: bump `updated_at` even when only a field
///   subset is written, so downstream watchers observe the write.
/// - `update_fields`: restrict the write to the named columns.
///
/// A full save (no field subset) always bumps `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub always_update_timestamp: bool,
    pub update_fields: Option<Vec<&'static str>>,
}

impl SaveOptions {
    /// Writes every column.
    pub fn full() -> Self {
        Self::default()
    }

    /// Writes every column and forces a timestamp bump.
    pub fn touched() -> Self {
        Self {
            always_update_timestamp: true,
            update_fields: None,
        }
    }

    /// Writes only the named columns without bumping the timestamp.
    pub fn only(fields: &[&'static str]) -> Self {
        Self {
            always_update_timestamp: false,
            update_fields: Some(fields.to_vec()),
        }
    }

    /// Returns whether `field` is part of this write.
    pub fn includes(&self, field: &str) -> bool {
        match &self.update_fields {
            Some(fields) => fields.contains(&field),
            None => true,
        }
    }

    /// Returns whether this write advances `updated_at`.
    pub fn bumps_timestamp(&self) -> bool {
        self.always_update_timestamp || self.update_fields.is_none()
    }
}

/// Lifecycle transition observed on a parent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Notification emitted by the store after a parent instance write commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub instance_id: ResourceId,
}

/// Typed resource store interface.
///
/// Relationship traversal is explicit: callers resolve foreign-key ids
/// through these lookups instead of following references on records.
pub trait ResourceStore {
    /// Returns live parent instances with exactly this name.
    fn find_service_instances(&self, name: &str) -> StoreResult<Vec<ServiceInstance>>;
    fn get_service_instance(
        &self,
        id: ResourceId,
        include_deleted: bool,
    ) -> StoreResult<Option<ServiceInstance>>;
    fn list_service_instances(&self, include_deleted: bool) -> StoreResult<Vec<ServiceInstance>>;
    fn get_example_service(&self, id: ResourceId) -> StoreResult<Option<ExampleService>>;
    /// Returns the first registered compute provider.
    fn first_compute_service(&self) -> StoreResult<Option<ComputeService>>;
    /// Resolves the workload class registered by a compute provider.
    fn service_instance_class(&self, service_id: ResourceId)
        -> StoreResult<Option<InstanceClass>>;
    /// Returns slices of an owning service in creation order.
    fn slices_of(&self, service_id: ResourceId) -> StoreResult<Vec<Slice>>;
    fn get_image(&self, id: ResourceId) -> StoreResult<Option<Image>>;
    fn get_color(&self, id: ResourceId) -> StoreResult<Option<Color>>;
    /// Returns embedded images of a parent in display order.
    fn embedded_images(&self, instance_id: ResourceId) -> StoreResult<Vec<EmbeddedImage>>;
    fn get_workload(&self, id: ResourceId) -> StoreResult<Option<WorkloadInstance>>;
    fn config_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<ConfigMount>>;
    fn secret_mounts(&self, workload_id: ResourceId) -> StoreResult<Vec<SecretMount>>;
    fn get_config_artifact(&self, id: ResourceId) -> StoreResult<Option<ConfigArtifact>>;
    fn get_secret_artifact(&self, id: ResourceId) -> StoreResult<Option<SecretArtifact>>;

    fn save_service_instance(
        &self,
        instance: &ServiceInstance,
        options: &SaveOptions,
    ) -> StoreResult<()>;
    /// Removes a parent record after its delete policy ran.
    fn purge_service_instance(&self, id: ResourceId) -> StoreResult<()>;
    fn create_workload(&self, workload: &mut WorkloadInstance) -> StoreResult<ResourceId>;
    fn save_workload(&self, workload: &WorkloadInstance, options: &SaveOptions)
        -> StoreResult<()>;
    /// Deletes a workload, its mounts, and the artifacts bound by them.
    fn delete_workload(&self, id: ResourceId) -> StoreResult<()>;
    fn create_config_artifact(&self, artifact: &mut ConfigArtifact) -> StoreResult<ResourceId>;
    fn save_config_artifact(
        &self,
        artifact: &ConfigArtifact,
        options: &SaveOptions,
    ) -> StoreResult<()>;
    fn create_config_mount(&self, mount: &mut ConfigMount) -> StoreResult<ResourceId>;
    fn create_secret_artifact(&self, artifact: &mut SecretArtifact) -> StoreResult<ResourceId>;
    fn create_secret_mount(&self, mount: &mut SecretMount) -> StoreResult<ResourceId>;
}

#[cfg(test)]
mod tests {
    use super::SaveOptions;

    #[test]
    fn field_subset_save_does_not_bump_unless_touched() {
        let only = SaveOptions::only(&["no_sync"]);
        assert!(!only.bumps_timestamp());
        assert!(only.includes("no_sync"));
        assert!(!only.includes("name"));

        assert!(SaveOptions::full().bumps_timestamp());
        assert!(SaveOptions::touched().bumps_timestamp());
    }
}
