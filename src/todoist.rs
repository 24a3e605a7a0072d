//! Todoist REST API client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{SinkError, SinkResult};
use crate::format;
use crate::models::BookingPayload;

/// Todoist REST API endpoint
const TODOIST_API_URL: &str = "https://api.todoist.com/rest/v2";

/// Remote task operations the dispatcher drives.
///
/// Any failure is fatal for the event being reconciled; the webhook sender's
/// retry mechanism is the only retry path.
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Create a task from a booking and return its id.
    async fn create(&self, booking: &BookingPayload) -> SinkResult<String>;

    /// Rewrite a task's content, description, due date and duration from a
    /// rescheduled booking.
    async fn update_schedule(&self, task_id: &str, booking: &BookingPayload) -> SinkResult<()>;

    /// Rewrite a task's description with a status prefix.
    async fn update_description(
        &self,
        task_id: &str,
        booking: &BookingPayload,
        prefix: &str,
    ) -> SinkResult<()>;

    /// Append a comment to a task.
    async fn add_comment(&self, task_id: &str, content: &str) -> SinkResult<()>;

    /// Delete a task.
    async fn delete(&self, task_id: &str) -> SinkResult<()>;

    /// Mark a task complete.
    async fn complete(&self, task_id: &str) -> SinkResult<()>;
}

/// Todoist REST client.
///
/// Constructed once at startup and reused for the process lifetime; the
/// authorization header is baked into the underlying client.
#[derive(Debug, Clone)]
pub struct TodoistClient {
    client: reqwest::Client,
    api_url: String,
    project_id: Option<String>,
}

/// Task object returned by task creation.
#[derive(Debug, Deserialize)]
struct CreatedTask {
    id: String,
}

impl TodoistClient {
    /// Create a new Todoist client with an API token.
    ///
    /// # Errors
    /// Returns an error if headers cannot be constructed
    pub fn new(api_token: &str, project_id: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_token}"))
                .context("Invalid API token")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: TODOIST_API_URL.to_string(),
            project_id,
        })
    }

    /// Create a client with a custom API URL (for testing)
    #[cfg(test)]
    fn with_url(api_token: &str, api_url: &str, project_id: Option<String>) -> Result<Self> {
        let mut client = Self::new(api_token, project_id)?;
        client.api_url = api_url.to_string();
        Ok(client)
    }

    /// Task fields common to creation and schedule updates.
    fn task_body(&self, booking: &BookingPayload, include_project: bool) -> Value {
        let mut body = Map::new();
        body.insert("content".to_string(), json!(format::task_content(booking)));
        body.insert(
            "description".to_string(),
            json!(format::description(booking, None)),
        );
        body.insert("due_datetime".to_string(), json!(format::due_date(booking)));
        if include_project {
            if let Some(project_id) = &self.project_id {
                body.insert("project_id".to_string(), json!(project_id));
            }
        }
        if let Some(length) = booking.length {
            body.insert("duration".to_string(), json!(length));
            body.insert("duration_unit".to_string(), json!("minute"));
        }
        Value::Object(body)
    }

    async fn post(&self, url: &str, body: &Value) -> SinkResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::tracker(format!("request to Todoist failed: {e}")))?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> SinkResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::tracker(format!(
            "Todoist returned {status}: {body}"
        )))
    }
}

#[async_trait]
impl TaskClient for TodoistClient {
    async fn create(&self, booking: &BookingPayload) -> SinkResult<String> {
        let body = self.task_body(booking, true);
        let response = self.post(&format!("{}/tasks", self.api_url), &body).await?;
        let task: CreatedTask = response
            .json()
            .await
            .map_err(|e| SinkError::tracker(format!("failed to parse Todoist response: {e}")))?;
        debug!(task_id = %task.id, "Created Todoist task");
        Ok(task.id)
    }

    async fn update_schedule(&self, task_id: &str, booking: &BookingPayload) -> SinkResult<()> {
        let body = self.task_body(booking, false);
        self.post(&format!("{}/tasks/{task_id}", self.api_url), &body)
            .await?;
        debug!(task_id = %task_id, "Updated Todoist task schedule");
        Ok(())
    }

    async fn update_description(
        &self,
        task_id: &str,
        booking: &BookingPayload,
        prefix: &str,
    ) -> SinkResult<()> {
        let body = json!({
            "description": format::description(booking, Some(prefix)),
        });
        self.post(&format!("{}/tasks/{task_id}", self.api_url), &body)
            .await?;
        debug!(task_id = %task_id, "Updated Todoist task description");
        Ok(())
    }

    async fn add_comment(&self, task_id: &str, content: &str) -> SinkResult<()> {
        let body = json!({
            "task_id": task_id,
            "content": content,
        });
        self.post(&format!("{}/comments", self.api_url), &body)
            .await?;
        debug!(task_id = %task_id, "Added Todoist comment");
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> SinkResult<()> {
        let response = self
            .client
            .delete(format!("{}/tasks/{task_id}", self.api_url))
            .send()
            .await
            .map_err(|e| SinkError::tracker(format!("request to Todoist failed: {e}")))?;
        Self::check_status(response).await?;
        debug!(task_id = %task_id, "Deleted Todoist task");
        Ok(())
    }

    async fn complete(&self, task_id: &str) -> SinkResult<()> {
        self.post(
            &format!("{}/tasks/{task_id}/close", self.api_url),
            &json!({}),
        )
        .await?;
        debug!(task_id = %task_id, "Completed Todoist task");
        Ok(())
    }
}
