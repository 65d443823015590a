//! Typed resource records managed by the synchronizer.
//!
//! # Responsibility
//! - Define the records read and written by the reconciliation policy.
//! - Keep relationships as explicit foreign-key ids, resolved through the
//!   resource store rather than by traversal on the record itself.
//! - Provide declaration-level validation shared by every store backend.
//!
//! # Invariants
//! - A record with `id == None` has never been persisted.
//! - Resource names are DNS-1123 labels.
//! - Mount paths are absolute.

pub mod artifact;
pub mod compute;
pub mod instance;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned primary key shared by every record type.
pub type ResourceId = i64;

const MAX_NAME_LEN: usize = 63;

static DNS_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid dns label regex"));
static COLOR_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid color code regex")
});

/// Declaration-level validation failures for resource records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    EmptyField(&'static str),
    /// Name is not a lowercase DNS-1123 label.
    InvalidName { field: &'static str, value: String },
    /// Mount path is not absolute.
    RelativeMountPath(String),
    /// Color code is not `#rgb` or `#rrggbb`.
    InvalidColorCode(String),
    /// Serialized artifact payload is not a JSON object of strings.
    InvalidArtifactData(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` cannot be empty"),
            Self::InvalidName { field, value } => write!(
                f,
                "`{field}` must be a lowercase DNS label (max {MAX_NAME_LEN} chars), got `{value}`"
            ),
            Self::RelativeMountPath(path) => {
                write!(f, "mount path must be absolute, got `{path}`")
            }
            Self::InvalidColorCode(code) => {
                write!(f, "color code must be #rgb or #rrggbb, got `{code}`")
            }
            Self::InvalidArtifactData(details) => write!(f, "invalid artifact data: {details}"),
        }
    }
}

impl Error for ValidationError {}

/// Returns whether `value` is a valid DNS-1123 label.
pub fn is_dns_label(value: &str) -> bool {
    value.len() <= MAX_NAME_LEN && DNS_LABEL_RE.is_match(value)
}

pub(crate) fn require_dns_label(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if !is_dns_label(value) {
        return Err(ValidationError::InvalidName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_absolute_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::RelativeMountPath(path.to_string()));
    }
    Ok(())
}

pub(crate) fn require_color_code(code: &str) -> Result<(), ValidationError> {
    if !COLOR_CODE_RE.is_match(code) {
        return Err(ValidationError::InvalidColorCode(code.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{is_dns_label, require_absolute_path, require_color_code, ValidationError};

    #[test]
    fn dns_label_accepts_generated_workload_names() {
        assert!(is_dns_label("simpleexampleserviceinstance-1112"));
        assert!(is_dns_label("simpleexampleserviceinstance-map-1112"));
    }

    #[test]
    fn dns_label_rejects_uppercase_and_edge_dashes() {
        assert!(!is_dns_label("Upper"));
        assert!(!is_dns_label("-leading"));
        assert!(!is_dns_label("trailing-"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }

    #[test]
    fn mount_path_must_be_absolute() {
        let err = require_absolute_path("usr/local").unwrap_err();
        assert_eq!(err, ValidationError::RelativeMountPath("usr/local".to_string()));
    }

    #[test]
    fn color_code_accepts_short_and_long_forms() {
        assert!(require_color_code("#fff").is_ok());
        assert!(require_color_code("#00FF7f").is_ok());
        assert!(require_color_code("red").is_err());
    }
}
