//! Event rules.
//!
//! Each rule looks at one [`Event`] and decides on its own whether to call
//! back into Asana. Rules share no state and never see each other's results.
//!
//! - [`ProjectTagRule`] tags new tasks with their project's name
//! - [`NewProjectRule`] subscribes to newly created projects
//! - [`BacklogRule`] files tasks from "Top Priority" sections into the backlog
//! - [`CustomFieldRule`] classifies current-project tasks by their other project
//!
//! [`RuleSet`] runs the rules over a batch of events, one event and one rule
//! at a time, logging failures instead of propagating them.

mod backlog;
mod custom_field;
mod new_project;
mod project_tag;

pub use backlog::BacklogRule;
pub use custom_field::CustomFieldRule;
pub use new_project::NewProjectRule;
pub use project_tag::ProjectTagRule;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::TaskService;
use crate::config::Config;
use crate::error::AsanaError;
use crate::events::Event;
use crate::lifecycle::WebhookManager;

/// Result of applying a rule to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event doesn't match the rule's trigger.
    NotApplicable,
    /// The desired state already holds.
    AlreadySatisfied,
    /// The rule issued its mutating calls.
    Applied,
}

/// A single automation triggered by webhook events.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Inspect an event and act on it if it matches.
    async fn apply(&self, event: &Event) -> Result<Outcome, AsanaError>;
}

/// Counts of rule outcomes across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub events: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fixed, ordered set of rules applied to every event.
pub struct RuleSet {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    /// Create a rule set with specific rules, applied in the given order.
    #[must_use]
    pub fn with_rules(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Build the standard rule set.
    #[must_use]
    pub fn standard(
        client: Arc<dyn TaskService>,
        webhooks: Arc<WebhookManager>,
        config: &Config,
    ) -> Self {
        let policy = &config.rules;
        Self::with_rules(vec![
            Arc::new(ProjectTagRule::new(
                Arc::clone(&client),
                &config.workspace_gid,
                &policy.current_project,
            )),
            Arc::new(NewProjectRule::new(webhooks)),
            Arc::new(BacklogRule::new(
                Arc::clone(&client),
                &policy.backlog_section_gid,
                &policy.backlog_label,
                policy.backlog_excluded_sections.clone(),
            )),
            Arc::new(CustomFieldRule::new(
                client,
                &policy.custom_field_gid,
                &policy.current_project,
            )),
        ])
    }

    /// Names of the registered rules, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule to one event.
    ///
    /// A failing rule is logged and does not stop the rules after it.
    pub async fn dispatch(&self, event: &Event) -> BatchReport {
        let mut report = BatchReport {
            events: 1,
            ..BatchReport::default()
        };

        for rule in &self.rules {
            match rule.apply(event).await {
                Ok(Outcome::Applied) => {
                    info!(
                        rule = rule.name(),
                        resource_gid = %event.resource.gid,
                        "Rule applied"
                    );
                    report.applied += 1;
                }
                Ok(outcome) => {
                    debug!(
                        rule = rule.name(),
                        resource_gid = %event.resource.gid,
                        outcome = ?outcome,
                        "Rule skipped"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        rule = rule.name(),
                        action = ?event.action,
                        resource_gid = %event.resource.gid,
                        parent_gid = ?event.parent_gid(),
                        error = %e,
                        "Rule failed"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Apply every rule to each event of a batch, in order.
    pub async fn process_batch(&self, events: &[Event]) -> BatchReport {
        let mut total = BatchReport::default();

        for event in events {
            let report = self.dispatch(event).await;
            total.events += report.events;
            total.applied += report.applied;
            total.skipped += report.skipped;
            total.failed += report.failed;
        }

        total
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::event;
    use super::*;
    use crate::events::{EventAction, ResourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Rule that records how often it ran and returns a fixed result.
    struct FixedRule {
        name: &'static str,
        calls: AtomicUsize,
        fail: bool,
        outcome: Outcome,
    }

    impl FixedRule {
        fn new(name: &'static str, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: false,
                outcome,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: true,
                outcome: Outcome::Applied,
            })
        }
    }

    #[async_trait]
    impl Rule for FixedRule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn apply(&self, _event: &Event) -> Result<Outcome, AsanaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AsanaError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.outcome)
        }
    }

    fn task_added() -> Event {
        event(
            EventAction::Added,
            ("1", ResourceType::Task),
            Some(("2", ResourceType::Project)),
        )
    }

    #[tokio::test]
    async fn test_failing_rule_does_not_block_siblings() {
        let failing = FixedRule::failing("failing");
        let applied = FixedRule::new("applied", Outcome::Applied);
        let rules = RuleSet::with_rules(vec![failing.clone() as Arc<dyn Rule>, applied.clone()]);

        let report = rules.dispatch(&task_added()).await;

        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(applied.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 1);
    }

    #[tokio::test]
    async fn test_batch_keeps_going_after_failures() {
        let failing = FixedRule::failing("failing");
        let skipped = FixedRule::new("skipped", Outcome::NotApplicable);
        let satisfied = FixedRule::new("satisfied", Outcome::AlreadySatisfied);
        let rules = RuleSet::with_rules(vec![
            failing.clone() as Arc<dyn Rule>,
            skipped.clone(),
            satisfied,
        ]);

        let events = vec![task_added(), task_added(), task_added()];
        let report = rules.process_batch(&events).await;

        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
        assert_eq!(skipped.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            report,
            BatchReport {
                events: 3,
                applied: 0,
                skipped: 6,
                failed: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let only: Arc<dyn Rule> = FixedRule::new("only", Outcome::Applied);
        let rules = RuleSet::with_rules(vec![only]);
        assert_eq!(rules.process_batch(&[]).await, BatchReport::default());
    }

    #[test]
    fn test_standard_rule_order() {
        use crate::client::MockTaskService;

        let config = Config::from_lookup(|key| {
            let value = match key {
                "ASANA_ACCESS_TOKEN" => "token",
                "ASANA_WORKSPACE" => "ws",
                "ASANA_TEAM" => "team",
                "ASANA_BACKLOG_SECTION" => "backlog",
                "ASANA_CUSTOM_FIELD" => "cf",
                "WEBHOOK_URL" => "https://relay.example.com/",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();

        let client: Arc<dyn TaskService> = Arc::new(MockTaskService::new());
        let webhooks = Arc::new(WebhookManager::new(
            Arc::clone(&client),
            "ws",
            "team",
            "https://relay.example.com/",
        ));

        let rules = RuleSet::standard(client, webhooks, &config);
        assert_eq!(
            rules.names(),
            vec!["project-tag", "new-project", "backlog", "custom-field"]
        );
    }
}
