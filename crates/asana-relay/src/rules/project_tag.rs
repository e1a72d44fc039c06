//! Tag new tasks with the name of the project they were added to.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Outcome, Rule};
use crate::client::TaskService;
use crate::error::AsanaError;
use crate::events::Event;
use crate::models::Tag;

/// Attaches a workspace tag named after the project to every task added to it.
///
/// Tasks added to the "current" project are left alone; that project is
/// handled by [`super::CustomFieldRule`] instead.
pub struct ProjectTagRule {
    client: Arc<dyn TaskService>,
    workspace_gid: String,
    excluded_project: String,
}

impl ProjectTagRule {
    #[must_use]
    pub fn new(
        client: Arc<dyn TaskService>,
        workspace_gid: impl Into<String>,
        excluded_project: impl Into<String>,
    ) -> Self {
        Self {
            client,
            workspace_gid: workspace_gid.into(),
            excluded_project: excluded_project.into(),
        }
    }

    /// Find a workspace tag by exact name, creating it if missing.
    ///
    /// Not atomic: two concurrent calls for the same name can both create a tag.
    async fn find_or_create_tag(
        &self,
        name: &str,
        color: Option<String>,
    ) -> Result<Tag, AsanaError> {
        let tags = self.client.list_tags(&self.workspace_gid).await?;
        if let Some(tag) = tags.into_iter().find(|tag| tag.name == name) {
            return Ok(tag);
        }

        let tag = self
            .client
            .create_tag(&self.workspace_gid, name, color)
            .await?;
        info!(tag_gid = %tag.gid, tag = %tag.name, "Created tag");
        Ok(tag)
    }
}

#[async_trait]
impl Rule for ProjectTagRule {
    fn name(&self) -> &'static str {
        "project-tag"
    }

    async fn apply(&self, event: &Event) -> Result<Outcome, AsanaError> {
        if !event.is_task_added_to_project() {
            return Ok(Outcome::NotApplicable);
        }
        let Some(project_gid) = event.parent_gid() else {
            return Ok(Outcome::NotApplicable);
        };

        let project = self.client.get_project(project_gid).await?;
        if project.name.is_empty() || project.name == self.excluded_project {
            debug!(project = %project.name, "Project is not tagged");
            return Ok(Outcome::NotApplicable);
        }

        let task = self.client.get_task(&event.resource.gid).await?;
        if task.has_tag_named(&project.name) {
            return Ok(Outcome::AlreadySatisfied);
        }

        info!(
            project = %project.name,
            task_gid = %task.gid,
            "Project got a new task"
        );

        let tag = self
            .find_or_create_tag(&project.name, project.color.clone())
            .await?;
        self.client.add_tag_to_task(&task.gid, &tag.gid).await?;

        info!(
            tag = %tag.name,
            tag_gid = %tag.gid,
            task = %task.name,
            "Tag added to task"
        );
        Ok(Outcome::Applied)
    }
}
