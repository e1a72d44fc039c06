//! Webhook payload parsing for Asana event callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Header Asana sends once, when a webhook is created, to prove endpoint ownership.
pub const HOOK_SECRET_HEADER: &str = "x-hook-secret";

/// Event action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Resource added to its parent
    Added,
    /// Resource removed from its parent
    Removed,
    /// A field on the resource changed
    Changed,
    /// Resource deleted
    Deleted,
    /// Resource restored from trash
    Undeleted,
    /// Unknown action (catch-all to avoid parse failures)
    #[serde(other)]
    Unknown,
}

/// Asana resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Task,
    Project,
    Section,
    Story,
    Tag,
    CustomField,
    Attachment,
    Team,
    Workspace,
    User,
    /// Unknown type (catch-all to avoid parse failures)
    #[serde(other)]
    Unknown,
}

/// Compact reference to the resource an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResource {
    pub gid: String,
    pub resource_type: ResourceType,
}

/// A single change reported inside a webhook callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub action: EventAction,
    pub resource: EventResource,
    /// Parent the resource was added to or removed from, if any.
    #[serde(default)]
    pub parent: Option<EventResource>,
    /// User who triggered the change.
    #[serde(default)]
    pub user: Option<EventResource>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Check whether this event is `action` on a `resource_type` whose parent is `parent_type`.
    ///
    /// Events without a parent never match.
    #[must_use]
    pub fn is(
        &self,
        action: EventAction,
        resource_type: ResourceType,
        parent_type: ResourceType,
    ) -> bool {
        self.action == action
            && self.resource.resource_type == resource_type
            && self
                .parent
                .as_ref()
                .is_some_and(|p| p.resource_type == parent_type)
    }

    /// Check whether a task was added to a project.
    #[must_use]
    pub fn is_task_added_to_project(&self) -> bool {
        self.is(EventAction::Added, ResourceType::Task, ResourceType::Project)
    }

    /// Check whether a task was added to a section.
    #[must_use]
    pub fn is_task_added_to_section(&self) -> bool {
        self.is(EventAction::Added, ResourceType::Task, ResourceType::Section)
    }

    /// Check whether a project was created.
    #[must_use]
    pub fn is_project_added(&self) -> bool {
        self.action == EventAction::Added && self.resource.resource_type == ResourceType::Project
    }

    /// Get the parent GID
    #[must_use]
    pub fn parent_gid(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.gid.as_str())
    }
}

/// Body of a webhook callback.
///
/// Handshake requests carry `{}`, event deliveries carry `{"events": [...]}`.
/// Events are kept raw until [`WebhookPayload::into_events`] so that one
/// undecodable entry doesn't take the rest of the batch down with it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    events: Value,
}

impl WebhookPayload {
    /// Parse a callback body.
    ///
    /// Any JSON is accepted; bodies that aren't an object yield an empty payload.
    ///
    /// # Errors
    /// Returns an error if the body is not JSON at all.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Whether the body carries an `events` array (possibly empty).
    #[must_use]
    pub fn has_events(&self) -> bool {
        self.events.is_array()
    }

    /// Decode each event on its own, dropping the ones that don't parse.
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        let Value::Array(raw) = self.events else {
            return Vec::new();
        };

        raw.into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<Event>(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable event");
                    None
                }
            })
            .collect()
    }
}
