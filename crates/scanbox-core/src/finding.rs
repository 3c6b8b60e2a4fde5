use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// How severe a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Purely informational, no direct risk.
    #[default]
    Informational,
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

/// OSI layer a finding relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OsiLayer {
    /// Layer 7.
    Application,
    /// Layer 6.
    Presentation,
    /// Layer 5.
    Session,
    /// Layer 4.
    Transport,
    /// Layer 3.
    Network,
    /// Layer 2.
    DataLink,
    /// Layer 1.
    Physical,
    /// Not tied to a layer.
    #[default]
    NotApplicable,
}

/// External reference for a finding (e.g. a CVE id).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reference {
    /// Identifier within the source.
    #[serde(default)]
    pub id: String,
    /// Where the identifier comes from.
    #[serde(default)]
    pub source: String,
}

/// One fact discovered by a scanning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Unique per finding; generated by the harness.
    pub id: String,
    /// Short name.
    pub name: String,
    /// Human readable description.
    pub description: String,
    /// What the finding was found at (host, URL, ...).
    pub location: String,
    /// Severity classification.
    pub severity: Severity,
    /// Backend-defined category (e.g. `Subdomain`).
    pub category: String,
    /// OSI layer classification.
    pub osi_layer: OsiLayer,
    /// Remediation hint.
    #[serde(default)]
    pub hint: String,
    /// External reference.
    #[serde(default)]
    pub reference: Reference,
    /// Backend-specific details.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Finding {
    /// Creates a finding with a freshly generated id and empty optional fields.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            location: location.into(),
            severity: Severity::default(),
            category: category.into(),
            osi_layer: OsiLayer::default(),
            hint: String::new(),
            reference: Reference::default(),
            attributes: HashMap::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the OSI layer.
    pub fn with_osi_layer(mut self, osi_layer: OsiLayer) -> Self {
        self.osi_layer = osi_layer;
        self
    }

    /// Adds one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
