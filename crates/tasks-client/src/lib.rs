use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tasks_types::domain::task::Task;
use thiserror::Error;

#[derive(Clone)]
pub struct TasksClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct TasksClient {
    base: Url,
    client: reqwest::Client,
}

/// Non-success answer from the service, with the message from its error body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl TasksClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<TasksClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(TasksClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn add_task(&self, req: AddTaskRequest) -> anyhow::Result<Task> {
        let res = self
            .client
            .post(self.url("tasks")?)
            .json(&req)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn get_task(&self, id: &str) -> anyhow::Result<Task> {
        let res = self
            .client
            .get(self.url(&format!("tasks/{id}"))?)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let res = self.client.get(self.url("tasks")?).send().await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update_task(&self, id: &str, req: UpdateTaskRequest) -> anyhow::Result<Task> {
        let res = self
            .client
            .patch(self.url(&format!("tasks/{id}"))?)
            .json(&req)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    /// Deletes a task and returns the identifier the service echoed back.
    pub async fn delete_task(&self, id: &str) -> anyhow::Result<String> {
        let res = self
            .client
            .delete(self.url(&format!("tasks/{id}"))?)
            .send()
            .await?;
        let deleted: DeletedTask = check(res).await?.json().await?;
        Ok(deleted.id)
    }
}

async fn check(res: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    };
    tracing::debug!(%status, %message, "tasks service returned an error");
    Err(ApiError { status, message }.into())
}

impl TasksClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<TasksClient> {
        if let Some(client) = self.client {
            return Ok(TasksClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(TasksClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddTaskRequest {
    pub title: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    pub description: String,
    pub status: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct DeletedTask {
    id: String,
}
