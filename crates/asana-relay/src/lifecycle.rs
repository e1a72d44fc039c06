//! Webhook subscription management.
//!
//! Every project in the workspace, plus the team's project-created stream,
//! should have exactly one webhook pointing at this service. Reconciliation
//! runs once at startup; drift is only corrected on the next restart.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::TaskService;
use crate::error::AsanaError;
use crate::models::{Webhook, WebhookFilter};

/// What `ensure_hook` did for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChange {
    /// A hook already targeted the configured URL.
    Unchanged,
    /// A fresh hook was created, after deleting `deleted` stale ones.
    Created { deleted: usize },
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn record(&mut self, result: &Result<HookChange, AsanaError>) {
        match result {
            Ok(HookChange::Unchanged) => self.unchanged += 1,
            Ok(HookChange::Created { deleted }) => {
                self.created += 1;
                self.deleted += deleted;
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Keeps this service's Asana webhooks pointed at the configured URL.
pub struct WebhookManager {
    client: Arc<dyn TaskService>,
    workspace_gid: String,
    team_gid: String,
    target: String,
}

impl WebhookManager {
    #[must_use]
    pub fn new(
        client: Arc<dyn TaskService>,
        workspace_gid: impl Into<String>,
        team_gid: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            client,
            workspace_gid: workspace_gid.into(),
            team_gid: team_gid.into(),
            target: target.into(),
        }
    }

    /// URL every managed hook should deliver to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Bring every project hook and the team hook in line with the target URL.
    ///
    /// Individual project failures are logged and counted but don't stop the
    /// pass; a team-hook failure is swallowed.
    ///
    /// # Errors
    /// Returns an error only if the initial webhook or project listing fails.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, AsanaError> {
        let hooks = self.client.list_webhooks(&self.workspace_gid).await?;
        let projects = self.client.list_projects(&self.workspace_gid).await?;

        info!(
            hooks = hooks.len(),
            projects = projects.len(),
            "Reconciling Asana webhooks"
        );

        let mut report = ReconcileReport::default();

        for project in &projects {
            let result = self.ensure_hook(&project.gid, &hooks, Vec::new()).await;
            if let Err(e) = &result {
                warn!(
                    project_gid = %project.gid,
                    project = %project.name,
                    error = %e,
                    "Failed to reconcile project webhook"
                );
            }
            report.record(&result);
        }

        let team_result = self
            .ensure_hook(&self.team_gid, &hooks, vec![WebhookFilter::project_added()])
            .await;
        if let Err(e) = &team_result {
            debug!(team_gid = %self.team_gid, error = %e, "Ignoring team webhook failure");
        }
        report.record(&team_result);

        info!(
            created = report.created,
            deleted = report.deleted,
            unchanged = report.unchanged,
            failed = report.failed,
            "Webhook reconciliation complete"
        );

        Ok(report)
    }

    /// Re-fetch this workspace's hooks and ensure one for `resource_gid`.
    ///
    /// # Errors
    /// Returns an error if listing, deleting or creating a hook fails.
    pub async fn refresh_resource(&self, resource_gid: &str) -> Result<HookChange, AsanaError> {
        let hooks = self.client.list_webhooks(&self.workspace_gid).await?;
        self.ensure_hook(resource_gid, &hooks, Vec::new()).await
    }

    /// Ensure exactly one hook on `resource_gid` targets the configured URL.
    ///
    /// `hooks` is the currently known hook list for the workspace. If an
    /// active hook on this resource already targets the URL it is left alone;
    /// otherwise every hook on the resource is deleted and a fresh one is
    /// created with `filters`. A hook Asana deactivated after failed
    /// deliveries counts as stale even when its target is right.
    ///
    /// # Errors
    /// Returns an error if deleting or creating a hook fails.
    pub async fn ensure_hook(
        &self,
        resource_gid: &str,
        hooks: &[Webhook],
        filters: Vec<WebhookFilter>,
    ) -> Result<HookChange, AsanaError> {
        let existing: Vec<&Webhook> = hooks
            .iter()
            .filter(|hook| hook.resource.gid == resource_gid)
            .collect();

        if existing
            .iter()
            .any(|hook| hook.active && hook.target == self.target)
        {
            debug!(resource_gid = %resource_gid, "Webhook already targets this service");
            return Ok(HookChange::Unchanged);
        }

        for stale in &existing {
            info!(
                resource_gid = %resource_gid,
                webhook_gid = %stale.gid,
                stale_target = %stale.target,
                "Deleting stale webhook"
            );
            self.client.delete_webhook(&stale.gid).await?;
        }

        let hook = self
            .client
            .create_webhook(resource_gid, &self.target, filters)
            .await?;
        info!(
            resource_gid = %resource_gid,
            webhook_gid = %hook.gid,
            "Created webhook"
        );

        Ok(HookChange::Created {
            deleted: existing.len(),
        })
    }
}
