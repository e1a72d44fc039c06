//! REST client for the Asana API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::AsanaError;
use crate::models::{CustomField, EnumOption, Project, Section, Tag, Task, Webhook, WebhookFilter};

/// Page size for list endpoints (Asana's maximum).
const PAGE_LIMIT: &str = "100";

const TASK_FIELDS: &str = "name,tags.name,projects.name,custom_fields.enum_value.name";
const PROJECT_FIELDS: &str = "name,color";
const SECTION_FIELDS: &str = "name,project.name";
const TAG_FIELDS: &str = "name,color";
const CUSTOM_FIELD_FIELDS: &str = "name,enum_options.name,enum_options.enabled";
const WEBHOOK_FIELDS: &str = "resource.name,target,active,filters";

/// Operations the relay needs from the task service.
///
/// Rules and the webhook lifecycle only depend on this trait, so they can be
/// exercised against a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskService: Send + Sync {
    // Tasks, projects, sections

    async fn get_task(&self, task_gid: &str) -> Result<Task, AsanaError>;

    async fn get_project(&self, project_gid: &str) -> Result<Project, AsanaError>;

    async fn get_section(&self, section_gid: &str) -> Result<Section, AsanaError>;

    async fn add_task_to_section(&self, section_gid: &str, task_gid: &str)
        -> Result<(), AsanaError>;

    async fn list_projects(&self, workspace_gid: &str) -> Result<Vec<Project>, AsanaError>;

    // Tags

    async fn list_tags(&self, workspace_gid: &str) -> Result<Vec<Tag>, AsanaError>;

    async fn create_tag(
        &self,
        workspace_gid: &str,
        name: &str,
        color: Option<String>,
    ) -> Result<Tag, AsanaError>;

    async fn add_tag_to_task(&self, task_gid: &str, tag_gid: &str) -> Result<(), AsanaError>;

    // Custom fields

    async fn get_custom_field(&self, field_gid: &str) -> Result<CustomField, AsanaError>;

    async fn create_enum_option(
        &self,
        field_gid: &str,
        name: &str,
    ) -> Result<EnumOption, AsanaError>;

    async fn set_task_custom_field(
        &self,
        task_gid: &str,
        field_gid: &str,
        option_gid: &str,
    ) -> Result<(), AsanaError>;

    // Webhooks

    async fn list_webhooks(&self, workspace_gid: &str) -> Result<Vec<Webhook>, AsanaError>;

    async fn create_webhook(
        &self,
        resource_gid: &str,
        target: &str,
        filters: Vec<WebhookFilter>,
    ) -> Result<Webhook, AsanaError>;

    async fn delete_webhook(&self, webhook_gid: &str) -> Result<(), AsanaError>;
}

/// Asana REST client
#[derive(Debug, Clone)]
pub struct AsanaClient {
    client: reqwest::Client,
    api_url: String,
}

/// `{"data": ...}` envelope used by every Asana response.
#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// Envelope of a paginated list response.
#[derive(Debug, Deserialize)]
struct PageResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    offset: String,
}

/// Asana error envelope.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// `{"data": ...}` envelope for request bodies.
#[derive(Debug, Serialize)]
struct DataRequest<T: Serialize> {
    data: T,
}

impl AsanaClient {
    /// Create a new Asana client.
    ///
    /// # Arguments
    /// * `access_token` - Personal access token (sent as a Bearer token)
    /// * `api_url` - API base URL, e.g. `https://app.asana.com/api/1.0`
    /// * `timeout` - Upper bound applied to every request
    ///
    /// # Errors
    /// Returns error if headers cannot be constructed
    pub fn new(access_token: &str, api_url: &str, timeout: Duration) -> Result<Self, AsanaError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| AsanaError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("asana-relay/0.1"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the relay configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self, AsanaError> {
        Self::new(&config.access_token, &config.api_url, config.request_timeout)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.api_url))
    }

    /// Send a request and return the raw response body.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<String, AsanaError> {
        let response = request.send().await.map_err(|e| timeout_or_http(path, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| timeout_or_http(path, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.errors.into_iter().next())
                .map_or(body, |e| e.message);
            return Err(AsanaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and unwrap the `data` field of the response.
    async fn execute<R: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<R, AsanaError> {
        let body = self.send(path, request).await?;
        let envelope: DataResponse<R> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }

    /// Fetch a single resource.
    async fn get<R: DeserializeOwned>(&self, path: &str, fields: &str) -> Result<R, AsanaError> {
        let request = self
            .request(Method::GET, path)
            .query(&[("opt_fields", fields)]);
        self.execute(path, request).await
    }

    /// Write to a resource, wrapping the body in a `data` envelope.
    async fn write<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: B,
    ) -> Result<R, AsanaError> {
        let request = self
            .request(method, path)
            .json(&DataRequest { data: body });
        self.execute(path, request).await
    }

    /// Fetch every page of a list endpoint.
    async fn list<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<R>, AsanaError> {
        let mut items = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("limit", PAGE_LIMIT)]);
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset.as_str())]);
            }

            let body = self.send(path, request).await?;
            let page: PageResponse<R> = serde_json::from_str(&body)?;
            items.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        debug!(path = %path, count = items.len(), "Fetched list");
        Ok(items)
    }
}

fn timeout_or_http(path: &str, error: reqwest::Error) -> AsanaError {
    if error.is_timeout() {
        AsanaError::Timeout {
            path: path.to_string(),
        }
    } else {
        AsanaError::Http(error)
    }
}

#[async_trait]
impl TaskService for AsanaClient {
    #[instrument(skip(self))]
    async fn get_task(&self, task_gid: &str) -> Result<Task, AsanaError> {
        self.get(&format!("/tasks/{task_gid}"), TASK_FIELDS).await
    }

    #[instrument(skip(self))]
    async fn get_project(&self, project_gid: &str) -> Result<Project, AsanaError> {
        self.get(&format!("/projects/{project_gid}"), PROJECT_FIELDS)
            .await
    }

    #[instrument(skip(self))]
    async fn get_section(&self, section_gid: &str) -> Result<Section, AsanaError> {
        self.get(&format!("/sections/{section_gid}"), SECTION_FIELDS)
            .await
    }

    #[instrument(skip(self))]
    async fn add_task_to_section(
        &self,
        section_gid: &str,
        task_gid: &str,
    ) -> Result<(), AsanaError> {
        let _: serde_json::Value = self
            .write(
                Method::POST,
                &format!("/sections/{section_gid}/addTask"),
                json!({ "task": task_gid }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_projects(&self, workspace_gid: &str) -> Result<Vec<Project>, AsanaError> {
        self.list(
            "/projects",
            &[
                ("workspace", workspace_gid),
                ("archived", "false"),
                ("opt_fields", PROJECT_FIELDS),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_tags(&self, workspace_gid: &str) -> Result<Vec<Tag>, AsanaError> {
        self.list(
            &format!("/workspaces/{workspace_gid}/tags"),
            &[("opt_fields", TAG_FIELDS)],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn create_tag(
        &self,
        workspace_gid: &str,
        name: &str,
        color: Option<String>,
    ) -> Result<Tag, AsanaError> {
        let mut body = json!({ "name": name });
        if let Some(color) = color {
            body["color"] = json!(color);
        }
        self.write(
            Method::POST,
            &format!("/workspaces/{workspace_gid}/tags"),
            body,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn add_tag_to_task(&self, task_gid: &str, tag_gid: &str) -> Result<(), AsanaError> {
        let _: serde_json::Value = self
            .write(
                Method::POST,
                &format!("/tasks/{task_gid}/addTag"),
                json!({ "tag": tag_gid }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_custom_field(&self, field_gid: &str) -> Result<CustomField, AsanaError> {
        self.get(&format!("/custom_fields/{field_gid}"), CUSTOM_FIELD_FIELDS)
            .await
    }

    #[instrument(skip(self))]
    async fn create_enum_option(
        &self,
        field_gid: &str,
        name: &str,
    ) -> Result<EnumOption, AsanaError> {
        self.write(
            Method::POST,
            &format!("/custom_fields/{field_gid}/enum_options"),
            json!({ "name": name }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn set_task_custom_field(
        &self,
        task_gid: &str,
        field_gid: &str,
        option_gid: &str,
    ) -> Result<(), AsanaError> {
        let _: serde_json::Value = self
            .write(
                Method::PUT,
                &format!("/tasks/{task_gid}"),
                json!({ "custom_fields": { field_gid: option_gid } }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_webhooks(&self, workspace_gid: &str) -> Result<Vec<Webhook>, AsanaError> {
        self.list(
            "/webhooks",
            &[("workspace", workspace_gid), ("opt_fields", WEBHOOK_FIELDS)],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn create_webhook(
        &self,
        resource_gid: &str,
        target: &str,
        filters: Vec<WebhookFilter>,
    ) -> Result<Webhook, AsanaError> {
        let mut body = json!({ "resource": resource_gid, "target": target });
        if !filters.is_empty() {
            body["filters"] = serde_json::to_value(filters)?;
        }
        self.write(Method::POST, "/webhooks", body).await
    }

    #[instrument(skip(self))]
    async fn delete_webhook(&self, webhook_gid: &str) -> Result<(), AsanaError> {
        let path = format!("/webhooks/{webhook_gid}");
        let request = self.request(Method::DELETE, &path);
        self.send(&path, request).await?;
        Ok(())
    }
}
