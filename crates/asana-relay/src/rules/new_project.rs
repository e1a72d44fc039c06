//! Subscribe to projects as soon as they are created.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Outcome, Rule};
use crate::error::AsanaError;
use crate::events::Event;
use crate::lifecycle::{HookChange, WebhookManager};

/// Creates (or refreshes) the webhook for a project announced on the team stream.
pub struct NewProjectRule {
    webhooks: Arc<WebhookManager>,
}

impl NewProjectRule {
    #[must_use]
    pub fn new(webhooks: Arc<WebhookManager>) -> Self {
        Self { webhooks }
    }
}

#[async_trait]
impl Rule for NewProjectRule {
    fn name(&self) -> &'static str {
        "new-project"
    }

    async fn apply(&self, event: &Event) -> Result<Outcome, AsanaError> {
        if !event.is_project_added() {
            return Ok(Outcome::NotApplicable);
        }

        match self.webhooks.refresh_resource(&event.resource.gid).await? {
            HookChange::Unchanged => Ok(Outcome::AlreadySatisfied),
            HookChange::Created { deleted } => {
                info!(
                    project_gid = %event.resource.gid,
                    replaced = deleted,
                    "New project added"
                );
                Ok(Outcome::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTaskService;
    use crate::events::{EventAction, ResourceType};
    use crate::models::{Compact, Webhook};
    use crate::rules::test_support::event;
    use mockall::predicate::eq;

    const TARGET: &str = "https://relay.example.com/";

    fn hook(gid: &str, resource: &str, target: &str) -> Webhook {
        Webhook {
            gid: gid.to_string(),
            resource: Compact {
                gid: resource.to_string(),
                name: String::new(),
            },
            target: target.to_string(),
            active: true,
            filters: vec![],
        }
    }

    fn rule(mock: MockTaskService) -> NewProjectRule {
        let manager = WebhookManager::new(Arc::new(mock), "ws", "team", TARGET);
        NewProjectRule::new(Arc::new(manager))
    }

    fn project_added(gid: &str) -> Event {
        event(
            EventAction::Added,
            (gid, ResourceType::Project),
            Some(("team", ResourceType::Team)),
        )
    }

    #[tokio::test]
    async fn test_creates_one_hook_for_new_project() {
        let mut mock = MockTaskService::new();
        mock.expect_list_webhooks()
            .returning(|_| Ok(vec![hook("w-team", "team", TARGET)]));
        mock.expect_delete_webhook().never();
        mock.expect_create_webhook()
            .withf(|resource, target, filters| {
                resource == "p7" && target == TARGET && filters.is_empty()
            })
            .times(1)
            .returning(|resource, target, _| Ok(hook("w7", resource, target)));

        let outcome = rule(mock).apply(&project_added("p7")).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
    }

    #[tokio::test]
    async fn test_replaces_stale_hook_first() {
        let mut mock = MockTaskService::new();
        mock.expect_list_webhooks()
            .returning(|_| Ok(vec![hook("w-old", "p7", "https://old.example.com/")]));
        mock.expect_delete_webhook()
            .with(eq("w-old"))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_create_webhook()
            .times(1)
            .returning(|resource, target, _| Ok(hook("w7", resource, target)));

        let outcome = rule(mock).apply(&project_added("p7")).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
    }

    #[tokio::test]
    async fn test_existing_hook_is_left_alone() {
        let mut mock = MockTaskService::new();
        mock.expect_list_webhooks()
            .returning(|_| Ok(vec![hook("w7", "p7", TARGET)]));
        mock.expect_create_webhook().never();

        let outcome = rule(mock).apply(&project_added("p7")).await.unwrap();
        assert_eq!(outcome, Outcome::AlreadySatisfied);
    }

    #[tokio::test]
    async fn test_ignores_non_project_events() {
        let rule = rule(MockTaskService::new());
        let task_added = event(
            EventAction::Added,
            ("42", ResourceType::Task),
            Some(("p7", ResourceType::Project)),
        );
        let project_removed = event(EventAction::Removed, ("p7", ResourceType::Project), None);

        assert_eq!(rule.apply(&task_added).await.unwrap(), Outcome::NotApplicable);
        assert_eq!(
            rule.apply(&project_removed).await.unwrap(),
            Outcome::NotApplicable
        );
    }
}
