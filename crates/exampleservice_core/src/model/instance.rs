//! Tenant-facing service records.
//!
//! # Responsibility
//! - Define the parent `ServiceInstance` whose lifecycle drives provisioning.
//! - Define the owning `ExampleService` and the decoration records
//!   (colors, embedded images) consumed by the renderer.
//!
//! # Invariants
//! - `compute_instance_id` is the only source of truth for "provisioned".
//! - `is_deleted` marks a parent whose teardown has been requested; the
//!   record is purged only after the delete policy ran.

use super::{require_color_code, require_dns_label, require_non_empty, ResourceId, ValidationError};
use serde::{Deserialize, Serialize};

/// Parent resource owned by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Store-assigned id; `None` until persisted.
    pub id: Option<ResourceId>,
    /// Lookup key used by inbound change events.
    pub name: String,
    /// Owning `ExampleService`.
    pub owner_id: ResourceId,
    pub tenant_message: String,
    pub tenant_secret: String,
    pub foreground_color_id: Option<ResourceId>,
    pub background_color_id: Option<ResourceId>,
    /// Provisioned workload, set last during first reconcile.
    pub compute_instance_id: Option<ResourceId>,
    /// Teardown requested; the delete policy runs before purge.
    pub is_deleted: bool,
    /// Unix epoch milliseconds of the last persisted write.
    pub updated_at: i64,
}

impl ServiceInstance {
    /// Column holding the provisioned workload reference.
    pub const FIELD_COMPUTE_INSTANCE: &'static str = "compute_instance_id";
    /// Column written by inbound change events.
    pub const FIELD_TENANT_MESSAGE: &'static str = "tenant_message";

    /// Creates an unpersisted instance with no decorations and no workload.
    pub fn new(
        name: impl Into<String>,
        owner_id: ResourceId,
        tenant_message: impl Into<String>,
        tenant_secret: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            owner_id,
            tenant_message: tenant_message.into(),
            tenant_secret: tenant_secret.into(),
            foreground_color_id: None,
            background_color_id: None,
            compute_instance_id: None,
            is_deleted: false,
            updated_at: 0,
        }
    }

    /// Validates record invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("service_instance.name", &self.name)
    }

    /// Returns whether a workload has already been provisioned.
    pub fn is_provisioned(&self) -> bool {
        self.compute_instance_id.is_some()
    }
}

/// Owning service shared by all tenant instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleService {
    pub id: Option<ResourceId>,
    pub name: String,
    pub service_message: String,
    pub service_secret: String,
}

impl ExampleService {
    pub fn new(
        name: impl Into<String>,
        service_message: impl Into<String>,
        service_secret: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            service_message: service_message.into(),
            service_secret: service_secret.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("example_service.name", &self.name)
    }
}

/// Named html color referenced as foreground or background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: Option<ResourceId>,
    pub name: String,
    /// `#rgb` or `#rrggbb`.
    pub html_code: String,
}

impl Color {
    pub fn new(name: impl Into<String>, html_code: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            html_code: html_code.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("color.name", &self.name)?;
        require_color_code(&self.html_code)
    }
}

/// Image embedded in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub id: Option<ResourceId>,
    pub name: String,
    pub url: String,
}

impl EmbeddedImage {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("embedded_image.name", &self.name)?;
        require_non_empty("embedded_image.url", &self.url)
    }
}
