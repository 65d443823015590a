//! Artifact renderer.
//!
//! # Responsibility
//! - Render the tenant landing page from parent + owning service fields.
//! - Serialize config and secret artifact payloads.
//!
//! # Invariants
//! - Output is a pure function of the input fields: byte-identical input
//!   yields byte-identical output. The policy diffs on this text.
//! - Optional fields that are `None` are omitted, never rendered empty.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde_json::{Map, Value};

/// File name of the service-level secret inside the secret artifact.
pub const SERVICE_SECRET_FILE: &str = "service_secret.txt";
/// File name of the tenant-level secret inside the secret artifact.
pub const TENANT_SECRET_FILE: &str = "tenant_secret.txt";

/// Image reference embedded in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexImage {
    pub name: String,
    pub url: String,
}

/// Inputs of the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFields {
    pub tenant_message: String,
    pub service_message: String,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    /// Display order is preserved.
    pub images: Vec<IndexImage>,
}

impl IndexFields {
    pub fn new(tenant_message: impl Into<String>, service_message: impl Into<String>) -> Self {
        Self {
            tenant_message: tenant_message.into(),
            service_message: service_message.into(),
            ..Self::default()
        }
    }
}

/// Renders the landing page HTML.
pub fn render_index(fields: &IndexFields) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Simple Example Service</title>\n",
    );

    let mut style = String::new();
    if let Some(color) = &fields.foreground_color {
        style.push_str(&format!(" color: {};", encode_text(color)));
    }
    if let Some(color) = &fields.background_color {
        style.push_str(&format!(" background-color: {};", encode_text(color)));
    }
    if !style.is_empty() {
        page.push_str(&format!("<style>\nbody {{{style} }}\n</style>\n"));
    }

    page.push_str("</head>\n<body>\n");
    page.push_str(&format!(
        "<h1>Service Message: \"{}\"</h1>\n",
        encode_text(&fields.service_message)
    ));
    page.push_str(&format!(
        "<h2>Tenant Message: \"{}\"</h2>\n",
        encode_text(&fields.tenant_message)
    ));

    for image in &fields.images {
        page.push_str(&format!(
            "<figure>\n<img src=\"{}\" alt=\"{}\">\n<figcaption>{}</figcaption>\n</figure>\n",
            encode_double_quoted_attribute(&image.url),
            encode_double_quoted_attribute(&image.name),
            encode_text(&image.name)
        ));
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Serializes the config artifact payload `{index_file_name: page}`.
pub fn render_config_data(fields: &IndexFields, index_file_name: &str) -> String {
    let mut data = Map::new();
    data.insert(
        index_file_name.to_string(),
        Value::String(render_index(fields)),
    );
    Value::Object(data).to_string()
}

/// Serializes the secret artifact payload with base64-encoded values.
pub fn render_secret_data(service_secret: &str, tenant_secret: &str) -> String {
    let mut data = Map::new();
    data.insert(
        SERVICE_SECRET_FILE.to_string(),
        Value::String(BASE64.encode(service_secret)),
    );
    data.insert(
        TENANT_SECRET_FILE.to_string(),
        Value::String(BASE64.encode(tenant_secret)),
    );
    Value::Object(data).to_string()
}
