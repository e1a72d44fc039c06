//! Configuration for the relay service.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default Asana REST endpoint.
pub const DEFAULT_API_URL: &str = "https://app.asana.com/api/1.0";

/// Relay configuration.
///
/// Not `Debug`: it carries the access token.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Asana personal access token.
    pub access_token: String,
    /// Asana API base URL.
    pub api_url: String,
    /// Upper bound on every outbound Asana call.
    pub request_timeout: Duration,
    /// Workspace whose projects and webhooks are managed.
    pub workspace_gid: String,
    /// Team watched for newly created projects.
    pub team_gid: String,
    /// Public URL Asana delivers webhook events to.
    pub webhook_url: String,
    /// Rule policy.
    pub rules: RulesConfig,
}

/// Policy values for the event rules.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Section tasks get filed into.
    pub backlog_section_gid: String,
    /// Section name (case-insensitive) that triggers filing into the backlog.
    pub backlog_label: String,
    /// Sections matching the label that must be left alone.
    pub backlog_excluded_sections: Vec<String>,
    /// Custom field classified from a task's second project.
    pub custom_field_gid: String,
    /// Name of the project whose tasks are not tagged and are classified instead.
    pub current_project: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if a required variable is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` if a required variable is missing or a value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => 3000,
        };

        let request_timeout = match get("ASANA_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ASANA_REQUEST_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(10),
        };

        let webhook_url = required("WEBHOOK_URL")?;
        if !webhook_url.starts_with("https://") && !webhook_url.starts_with("http://") {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_URL",
                value: webhook_url,
            });
        }

        Ok(Self {
            port,
            access_token: required("ASANA_ACCESS_TOKEN")?,
            api_url: get("ASANA_API_URL").map_or_else(
                || DEFAULT_API_URL.to_string(),
                |url| url.trim_end_matches('/').to_string(),
            ),
            request_timeout,
            workspace_gid: required("ASANA_WORKSPACE")?,
            team_gid: required("ASANA_TEAM")?,
            webhook_url,
            rules: RulesConfig {
                backlog_section_gid: required("ASANA_BACKLOG_SECTION")?,
                backlog_label: get("ASANA_BACKLOG_LABEL")
                    .unwrap_or_else(|| "Top Priority".to_string()),
                backlog_excluded_sections: get("ASANA_BACKLOG_EXCLUDED_SECTIONS").map_or_else(
                    || vec!["1156081171852558".to_string()],
                    |s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    },
                ),
                custom_field_gid: required("ASANA_CUSTOM_FIELD")?,
                current_project: get("ASANA_CURRENT_PROJECT")
                    .unwrap_or_else(|| "Current Run".to_string()),
            },
        })
    }
}
