//! Classify current-project tasks by the other project they belong to.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Outcome, Rule};
use crate::client::TaskService;
use crate::error::AsanaError;
use crate::events::Event;
use crate::models::EnumOption;

/// Sets an enum custom field on tasks that live in the "current" project
/// plus one other project, using the other project's name as the option.
pub struct CustomFieldRule {
    client: Arc<dyn TaskService>,
    field_gid: String,
    current_project: String,
}

impl CustomFieldRule {
    #[must_use]
    pub fn new(
        client: Arc<dyn TaskService>,
        field_gid: impl Into<String>,
        current_project: impl Into<String>,
    ) -> Self {
        Self {
            client,
            field_gid: field_gid.into(),
            current_project: current_project.into(),
        }
    }

    /// Find an enabled enum option by name, creating it if missing.
    ///
    /// Not atomic: two concurrent calls for the same name can both create an option.
    async fn find_or_create_option(&self, name: &str) -> Result<EnumOption, AsanaError> {
        let field = self.client.get_custom_field(&self.field_gid).await?;
        if let Some(option) = field.option_named(name) {
            return Ok(option.clone());
        }

        let option = self.client.create_enum_option(&self.field_gid, name).await?;
        info!(
            field = %field.name,
            option = %option.name,
            option_gid = %option.gid,
            "Created custom field option"
        );
        Ok(option)
    }
}

#[async_trait]
impl Rule for CustomFieldRule {
    fn name(&self) -> &'static str {
        "custom-field"
    }

    async fn apply(&self, event: &Event) -> Result<Outcome, AsanaError> {
        if !event.is_task_added_to_section() {
            return Ok(Outcome::NotApplicable);
        }

        let task = self.client.get_task(&event.resource.gid).await?;

        if !task.projects.iter().any(|p| p.name == self.current_project) {
            return Ok(Outcome::NotApplicable);
        }
        let Some(other) = task
            .projects
            .iter()
            .find(|p| p.name != self.current_project && !p.name.is_empty())
        else {
            return Ok(Outcome::NotApplicable);
        };

        // The field is only on the task when one of its projects carries it.
        let Some(value) = task.custom_field(&self.field_gid) else {
            return Ok(Outcome::NotApplicable);
        };
        if value.enum_value.is_some() {
            return Ok(Outcome::AlreadySatisfied);
        }

        let option = self.find_or_create_option(&other.name).await?;
        self.client
            .set_task_custom_field(&task.gid, &self.field_gid, &option.gid)
            .await?;

        info!(
            task_gid = %task.gid,
            option = %option.name,
            "Task classified"
        );
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTaskService;
    use crate::events::{EventAction, ResourceType};
    use crate::models::{CustomField, Task, TaskCustomField};
    use crate::rules::test_support::{compact, event, task, unset_field};
    use mockall::predicate::eq;

    fn option(gid: &str, name: &str, enabled: bool) -> EnumOption {
        EnumOption {
            gid: gid.to_string(),
            name: name.to_string(),
            enabled,
        }
    }

    fn field(options: Vec<EnumOption>) -> CustomField {
        CustomField {
            gid: "cf".to_string(),
            name: "Stream".to_string(),
            enum_options: options,
        }
    }

    fn current_and_website(gid: &str) -> Task {
        let mut task = task(gid);
        task.projects = vec![compact("p0", "Current Run"), compact("p1", "Website")];
        task.custom_fields = vec![unset_field("cf")];
        task
    }

    fn added_to_section() -> Event {
        event(
            EventAction::Added,
            ("42", ResourceType::Task),
            Some(("s1", ResourceType::Section)),
        )
    }

    fn rule(mock: MockTaskService) -> CustomFieldRule {
        CustomFieldRule::new(Arc::new(mock), "cf", "Current Run")
    }

    #[tokio::test]
    async fn test_sets_existing_option() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task()
            .with(eq("42"))
            .returning(|gid| Ok(current_and_website(gid)));
        mock.expect_get_custom_field()
            .with(eq("cf"))
            .returning(|_| Ok(field(vec![option("o1", "Website", true)])));
        mock.expect_create_enum_option().never();
        mock.expect_set_task_custom_field()
            .with(eq("42"), eq("cf"), eq("o1"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::Applied
        );
    }

    #[tokio::test]
    async fn test_creates_missing_option() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task()
            .returning(|gid| Ok(current_and_website(gid)));
        mock.expect_get_custom_field().returning(|_| {
            Ok(field(vec![
                option("o0", "Mobile", true),
                option("old", "Website", false),
            ]))
        });
        mock.expect_create_enum_option()
            .with(eq("cf"), eq("Website"))
            .times(1)
            .returning(|_, name| Ok(option("o2", name, true)));
        mock.expect_set_task_custom_field()
            .with(eq("42"), eq("cf"), eq("o2"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::Applied
        );
    }

    #[tokio::test]
    async fn test_field_already_set() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task().returning(|gid| {
            let mut task = current_and_website(gid);
            task.custom_fields = vec![TaskCustomField {
                gid: "cf".to_string(),
                enum_value: Some(option("o1", "Website", true)),
            }];
            Ok(task)
        });
        mock.expect_get_custom_field().never();
        mock.expect_set_task_custom_field().never();

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::AlreadySatisfied
        );
    }

    #[tokio::test]
    async fn test_task_outside_current_project() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task().returning(|gid| {
            let mut task = current_and_website(gid);
            task.projects = vec![compact("p1", "Website"), compact("p2", "Mobile")];
            Ok(task)
        });
        mock.expect_set_task_custom_field().never();

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::NotApplicable
        );
    }

    #[tokio::test]
    async fn test_task_only_in_current_project() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task().returning(|gid| {
            let mut task = current_and_website(gid);
            task.projects.truncate(1);
            Ok(task)
        });
        mock.expect_set_task_custom_field().never();

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::NotApplicable
        );
    }

    #[tokio::test]
    async fn test_field_missing_from_task() {
        let mut mock = MockTaskService::new();
        mock.expect_get_task().returning(|gid| {
            let mut task = current_and_website(gid);
            task.custom_fields.clear();
            Ok(task)
        });
        mock.expect_get_custom_field().never();

        assert_eq!(
            rule(mock).apply(&added_to_section()).await.unwrap(),
            Outcome::NotApplicable
        );
    }

    #[tokio::test]
    async fn test_task_added_to_project_is_ignored() {
        let rule = rule(MockTaskService::new());
        let event = event(
            EventAction::Added,
            ("42", ResourceType::Task),
            Some(("p1", ResourceType::Project)),
        );
        assert_eq!(rule.apply(&event).await.unwrap(), Outcome::NotApplicable);
    }
}
