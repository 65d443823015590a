//! Compute-provider records and provisioned workloads.
//!
//! # Invariants
//! - A `WorkloadInstance` saved with `no_sync = true` must not be picked up
//!   by downstream sync until the flag is cleared.
//! - `Slice.default_image_id` is optional at rest; provisioning requires it.

use super::{require_dns_label, require_non_empty, ResourceId, ValidationError};
use serde::{Deserialize, Serialize};

/// Leaf model used by a compute provider to materialize workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceClass {
    /// Pod-backed workload managed by the kubernetes provider.
    KubernetesServiceInstance,
}

/// Cluster-wide compute provider. Expected to be a singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeService {
    pub id: Option<ResourceId>,
    pub name: String,
    /// `None` when the provider has not registered an instance class.
    pub instance_class: Option<InstanceClass>,
}

impl ComputeService {
    pub fn new(name: impl Into<String>, instance_class: Option<InstanceClass>) -> Self {
        Self {
            id: None,
            name: name.into(),
            instance_class,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("compute_service.name", &self.name)
    }
}

/// Scope under which artifacts are provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDomain {
    pub id: Option<ResourceId>,
    pub name: String,
    /// Compute service that owns the domain.
    pub owner_id: ResourceId,
}

impl TrustDomain {
    pub fn new(name: impl Into<String>, owner_id: ResourceId) -> Self {
        Self {
            id: None,
            name: name.into(),
            owner_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("trust_domain.name", &self.name)
    }
}

/// Container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<ResourceId>,
    pub name: String,
    pub tag: String,
    pub kind: String,
}

impl Image {
    pub fn new(name: impl Into<String>, tag: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            tag: tag.into(),
            kind: kind.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("image.name", &self.name)?;
        require_non_empty("image.tag", &self.tag)
    }
}

/// Deployment slice of an owning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub id: Option<ResourceId>,
    pub name: String,
    /// Owning `ExampleService`.
    pub service_id: ResourceId,
    pub trust_domain_id: ResourceId,
    pub default_image_id: Option<ResourceId>,
}

impl Slice {
    pub fn new(
        name: impl Into<String>,
        service_id: ResourceId,
        trust_domain_id: ResourceId,
        default_image_id: Option<ResourceId>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            service_id,
            trust_domain_id,
            default_image_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("slice.name", &self.name)
    }
}

/// Provisioned compute unit backing one `ServiceInstance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub id: Option<ResourceId>,
    pub name: String,
    /// Compute service that materializes this workload.
    pub owner_id: ResourceId,
    pub slice_id: ResourceId,
    pub image_id: ResourceId,
    pub class: InstanceClass,
    /// Suppresses downstream sync while the object graph is assembled.
    pub no_sync: bool,
    /// Unix epoch milliseconds of the last persisted write.
    pub updated_at: i64,
}

impl WorkloadInstance {
    /// Column holding the suppress-sync flag.
    pub const FIELD_NO_SYNC: &'static str = "no_sync";

    pub fn new(
        name: impl Into<String>,
        owner_id: ResourceId,
        slice_id: ResourceId,
        image_id: ResourceId,
        class: InstanceClass,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            owner_id,
            slice_id,
            image_id,
            class,
            no_sync: false,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("workload_instance.name", &self.name)
    }
}
