//! File tasks from priority sections into the backlog section.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Outcome, Rule};
use crate::client::TaskService;
use crate::error::AsanaError;
use crate::events::Event;

/// Adds a task to the backlog section when it lands in a section whose name
/// matches the label, e.g. "Top Priority".
pub struct BacklogRule {
    client: Arc<dyn TaskService>,
    backlog_section_gid: String,
    label: String,
    excluded_sections: Vec<String>,
}

impl BacklogRule {
    #[must_use]
    pub fn new(
        client: Arc<dyn TaskService>,
        backlog_section_gid: impl Into<String>,
        label: &str,
        excluded_sections: Vec<String>,
    ) -> Self {
        Self {
            client,
            backlog_section_gid: backlog_section_gid.into(),
            label: label.to_lowercase(),
            excluded_sections,
        }
    }
}

#[async_trait]
impl Rule for BacklogRule {
    fn name(&self) -> &'static str {
        "backlog"
    }

    async fn apply(&self, event: &Event) -> Result<Outcome, AsanaError> {
        if !event.is_task_added_to_section() {
            return Ok(Outcome::NotApplicable);
        }
        let Some(section_gid) = event.parent_gid() else {
            return Ok(Outcome::NotApplicable);
        };

        if self.excluded_sections.iter().any(|s| s == section_gid) {
            debug!(section_gid = %section_gid, "Section excluded from backlog filing");
            return Ok(Outcome::NotApplicable);
        }
        if section_gid == self.backlog_section_gid {
            return Ok(Outcome::AlreadySatisfied);
        }

        let section = self.client.get_section(section_gid).await?;
        if section.name.to_lowercase() != self.label {
            return Ok(Outcome::NotApplicable);
        }

        self.client
            .add_task_to_section(&self.backlog_section_gid, &event.resource.gid)
            .await?;

        info!(
            task_gid = %event.resource.gid,
            section = %section.name,
            section_gid = %section.gid,
            project = ?section.project.as_ref().map(|p| p.name.as_str()),
            "Task filed into backlog"
        );
        Ok(Outcome::Applied)
    }
}
