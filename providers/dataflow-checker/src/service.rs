//! Access to Dataflow jobs and job messages

use crate::error::DataflowError;
use crate::job::{Job, JobStatus, LogMessage, MessageLevel};
use crate::token::TokenSource;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keiho_core::{retry_with_backoff, RetryConfig};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_ENDPOINT: &str = "https://dataflow.googleapis.com";

/// Source of jobs and job messages for [`crate::DataflowChecker`]
#[async_trait]
pub trait JobService: Send + Sync {
    /// Every job in the configured project and location
    async fn list_jobs(&self) -> Result<Vec<Job>>;

    /// Messages of `job_id` at `min_level` or above
    async fn get_logs(&self, job_id: &str, min_level: MessageLevel) -> Result<Vec<LogMessage>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListJobsResponse {
    #[serde(default)]
    jobs: Vec<ApiJob>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiJob {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    job_type: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    current_state: String,
    #[serde(default)]
    current_state_time: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListJobMessagesResponse {
    #[serde(default)]
    job_messages: Vec<ApiJobMessage>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiJobMessage {
    #[serde(default)]
    message_text: String,
    #[serde(default)]
    message_importance: String,
    time: String,
}

fn parse_timestamp(
    job_id: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<DateTime<Utc>> {
    let value = value.unwrap_or_default();
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| DataflowError::InvalidTimestamp {
            job_id: job_id.to_string(),
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl ApiJob {
    fn into_job(self, project: &str, location: &str) -> Result<Job> {
        // jobs that have not started yet only carry a create time
        let start_raw = self.start_time.as_deref().or(self.create_time.as_deref());
        let start_time = parse_timestamp(&self.id, "startTime", start_raw)?;
        let updated_at = parse_timestamp(
            &self.id,
            "currentStateTime",
            self.current_state_time.as_deref(),
        )?;

        Ok(Job {
            id: self.id,
            name: self.name,
            job_type: self.job_type,
            project: self.project_id.unwrap_or_else(|| project.to_string()),
            location: self.location.unwrap_or_else(|| location.to_string()),
            start_time,
            status: JobStatus {
                state: self.current_state,
                updated_at,
            },
        })
    }
}

/// [`JobService`] over the Dataflow v1b3 REST API
pub struct DataflowService {
    client: Client,
    base_url: String,
    project: String,
    location: String,
    tokens: Arc<dyn TokenSource>,
    retry: RetryConfig,
}

impl DataflowService {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let project = project.into();
        let location = location.into();

        if project.is_empty() || location.is_empty() {
            return Err(DataflowError::Configuration(
                "project and location are required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_ENDPOINT.to_string(),
            project,
            location,
            tokens,
            retry: RetryConfig::default(),
        })
    }

    /// Retry policy for transient API failures and rejected tokens
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Point the service at another endpoint, e.g. a regional or test server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/v1b3/projects/{}/locations/{}/jobs",
            self.base_url, self.project, self.location
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        retry_with_backoff(&self.retry, || self.fetch_once(url, query)).await
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let token = self.tokens.token().await?;

        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach Dataflow API: {}", e);
                DataflowError::Http(e)
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            warn!("Dataflow API rejected the access token, requesting a new one");
            self.tokens.invalidate();
            return Err(DataflowError::Unauthorized(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Dataflow API returned {}: {}", status, body);
            return Err(DataflowError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl JobService for DataflowService {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = self.jobs_url();
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: ListJobsResponse = match &page_token {
                Some(token) => self.fetch(&url, &[("pageToken", token.as_str())]).await?,
                None => self.fetch(&url, &[]).await?,
            };
            for job in page.jobs {
                jobs.push(job.into_job(&self.project, &self.location)?);
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "Listed {} jobs in {}/{}",
            jobs.len(),
            self.project,
            self.location
        );
        Ok(jobs)
    }

    async fn get_logs(&self, job_id: &str, min_level: MessageLevel) -> Result<Vec<LogMessage>> {
        let url = format!("{}/{}/messages", self.jobs_url(), job_id);
        let mut messages = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let importance = ("minimumImportance", min_level.as_str());
            let page: ListJobMessagesResponse = match &page_token {
                Some(token) => {
                    self.fetch(&url, &[importance, ("pageToken", token.as_str())])
                        .await?
                }
                None => self.fetch(&url, &[importance]).await?,
            };
            for message in page.job_messages {
                let time = parse_timestamp(job_id, "message time", Some(&message.time))?;
                messages.push(LogMessage {
                    text: message.message_text,
                    level: MessageLevel::from_api(&message.message_importance),
                    time,
                });
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Fetched {} messages for job {}", messages.len(), job_id);
        Ok(messages)
    }
}
