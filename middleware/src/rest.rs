use crate::client::Middleware;
use crate::error::{JobFailure, MiddlewareError};
use crate::types::{JobRecord, JobState};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

const API_PREFIX: &str = "api/v2.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Talks to the middleware over its HTTP API.
pub struct RestClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, MiddlewareError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| MiddlewareError::Config(format!("invalid api key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent("jailtab/0.1.0")
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn endpoint_url(&self, method: &str) -> Result<String, MiddlewareError> {
        endpoint_url(&self.base_url, method)
    }

    async fn post(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
        let url = self.endpoint_url(method)?;
        let body = request_body(args);

        tracing::debug!("POST {} {}", url, body);

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(MiddlewareError::Call {
                method: method.to_string(),
                message: format!("{}: {}", status, text.trim()),
                details: JobFailure::from_error_body(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn job_record(&self, job_id: u64) -> Result<JobRecord, MiddlewareError> {
        let url = self.endpoint_url("core.get_jobs")?;

        let response = self
            .client
            .get(&url)
            .query(&[("id", job_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(MiddlewareError::Call {
                method: "core.get_jobs".to_string(),
                message: format!("job {} lookup returned {}", job_id, status),
                details: JobFailure::from_error_body(&text),
            });
        }

        let mut records: Vec<JobRecord> = response.json().await?;
        records
            .pop()
            .ok_or_else(|| MiddlewareError::UnexpectedResponse(format!("no such job: {}", job_id)))
    }
}

#[async_trait]
impl Middleware for RestClient {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
        self.post(method, args).await
    }

    async fn job(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
        let started = self.post(method, args).await?;
        let job_id = started.as_u64().ok_or_else(|| {
            MiddlewareError::UnexpectedResponse(format!(
                "expected a job id from {}, got {}",
                method, started
            ))
        })?;

        tracing::debug!(job_id, "Waiting for job {}", method);

        loop {
            let record = self.job_record(job_id).await?;

            match record.state {
                JobState::Success => return Ok(record.result),
                JobState::Failed | JobState::Aborted => {
                    return Err(MiddlewareError::Job {
                        method: method.to_string(),
                        failure: record.into_failure(),
                    });
                }
                JobState::Waiting | JobState::Running => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

/// `jail.fstab` maps to `{base}/api/v2.0/jail/fstab`.
fn endpoint_url(base_url: &str, method: &str) -> Result<String, MiddlewareError> {
    let (namespace, name) = method
        .rsplit_once('.')
        .ok_or_else(|| MiddlewareError::Config(format!("malformed method name: {}", method)))?;

    Ok(format!(
        "{}/{}/{}/{}",
        base_url,
        API_PREFIX,
        namespace.replace('.', "/"),
        name
    ))
}

/// A single argument is sent bare, several as a positional array.
fn request_body(mut args: Vec<Value>) -> Value {
    match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    }
}
