//! Configuration and secret artifacts plus their mounts.
//!
//! # Invariants
//! - Artifact `data` is a JSON object mapping file names to text.
//! - Each workload carries exactly one config mount and one secret mount.

use super::{require_absolute_path, require_dns_label, ResourceId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named blob of rendered configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigArtifact {
    pub id: Option<ResourceId>,
    pub name: String,
    pub trust_domain_id: ResourceId,
    /// JSON object `{file_name: content}`.
    pub data: String,
    /// Unix epoch milliseconds; bumped on every forced save.
    pub updated_at: i64,
}

impl ConfigArtifact {
    pub fn new(
        name: impl Into<String>,
        trust_domain_id: ResourceId,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            trust_domain_id,
            data: data.into(),
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("config_artifact.name", &self.name)?;
        validate_artifact_data(&self.data)
    }
}

/// Binds a config artifact to a workload at a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMount {
    pub id: Option<ResourceId>,
    pub config_id: ResourceId,
    pub workload_id: ResourceId,
    pub mount_path: String,
}

impl ConfigMount {
    pub fn new(
        config_id: ResourceId,
        workload_id: ResourceId,
        mount_path: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            config_id,
            workload_id,
            mount_path: mount_path.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_absolute_path(&self.mount_path)
    }
}

/// Named blob of base64-encoded secret files. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretArtifact {
    pub id: Option<ResourceId>,
    pub name: String,
    pub trust_domain_id: ResourceId,
    /// JSON object `{file_name: base64}`.
    pub data: String,
}

impl SecretArtifact {
    pub fn new(
        name: impl Into<String>,
        trust_domain_id: ResourceId,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            trust_domain_id,
            data: data.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_dns_label("secret_artifact.name", &self.name)?;
        validate_artifact_data(&self.data)
    }
}

/// Binds a secret artifact to a workload at a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMount {
    pub id: Option<ResourceId>,
    pub secret_id: ResourceId,
    pub workload_id: ResourceId,
    pub mount_path: String,
}

impl SecretMount {
    pub fn new(
        secret_id: ResourceId,
        workload_id: ResourceId,
        mount_path: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            secret_id,
            workload_id,
            mount_path: mount_path.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_absolute_path(&self.mount_path)
    }
}

fn validate_artifact_data(data: &str) -> Result<(), ValidationError> {
    serde_json::from_str::<BTreeMap<String, String>>(data)
        .map(|_| ())
        .map_err(|err| ValidationError::InvalidArtifactData(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{ConfigArtifact, ConfigMount};

    #[test]
    fn config_artifact_rejects_non_object_payload() {
        let artifact = ConfigArtifact::new("simpleexampleserviceinstance-map-1", 1, "junk");
        assert!(artifact.validate().is_err());

        let artifact =
            ConfigArtifact::new("simpleexampleserviceinstance-map-1", 1, r#"{"index.html":"x"}"#);
        assert!(artifact.validate().is_ok());
    }

    #[test]
    fn mount_rejects_relative_path() {
        assert!(ConfigMount::new(1, 2, "htdocs").validate().is_err());
        assert!(ConfigMount::new(1, 2, "/usr/local/apache2/htdocs")
            .validate()
            .is_ok());
    }
}
