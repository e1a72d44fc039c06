//! Asana entity type definitions.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! API response is ignored.

use serde::{Deserialize, Serialize};

use crate::events::{EventAction, ResourceType};

/// Compact reference to another resource (`{gid, name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compact {
    /// Global ID
    pub gid: String,
    /// Display name, when requested via `opt_fields`
    #[serde(default)]
    pub name: String,
}

/// Asana task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Global ID
    pub gid: String,
    /// Task name
    #[serde(default)]
    pub name: String,
    /// Tags attached to the task
    #[serde(default)]
    pub tags: Vec<Compact>,
    /// Projects the task belongs to
    #[serde(default)]
    pub projects: Vec<Compact>,
    /// Custom field values on the task
    #[serde(default)]
    pub custom_fields: Vec<TaskCustomField>,
}

impl Task {
    /// Check if a tag with this exact name is attached.
    #[must_use]
    pub fn has_tag_named(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }

    /// Look up a custom field value by field GID.
    #[must_use]
    pub fn custom_field(&self, field_gid: &str) -> Option<&TaskCustomField> {
        self.custom_fields.iter().find(|f| f.gid == field_gid)
    }
}

/// Custom field value as seen on a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCustomField {
    /// Custom field GID
    pub gid: String,
    /// Selected option for enum fields
    #[serde(default)]
    pub enum_value: Option<EnumOption>,
}

/// Asana project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    /// Project colour (e.g. "dark-green"), reused for the project's tag
    #[serde(default)]
    pub color: Option<String>,
}

/// Asana section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: Option<Compact>,
}

/// Asana tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Custom field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enum_options: Vec<EnumOption>,
}

impl CustomField {
    /// Find an enabled enum option by name.
    ///
    /// Disabled options can't be set on tasks, so they are skipped.
    #[must_use]
    pub fn option_named(&self, name: &str) -> Option<&EnumOption> {
        self.enum_options
            .iter()
            .find(|o| o.enabled && o.name == name)
    }
}

/// Enum option of a custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

/// Asana webhook subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub gid: String,
    /// Resource the webhook is attached to
    pub resource: Compact,
    /// URL Asana delivers events to
    pub target: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub filters: Vec<WebhookFilter>,
}

/// Restricts which events a webhook delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookFilter {
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<EventAction>,
}

impl WebhookFilter {
    /// Filter for project creation events, used on the team webhook.
    #[must_use]
    pub const fn project_added() -> Self {
        Self {
            resource_type: ResourceType::Project,
            action: Some(EventAction::Added),
        }
    }
}
