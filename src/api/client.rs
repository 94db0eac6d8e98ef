//! REST client for the orchestration API.
//!
//! This module implements [`WorkloadGateway`] over the service's HTTP
//! surface, with bearer-token auth and bounded retries for transient
//! failures.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ApiError, FlowctlError, Result};

use super::gateway::WorkloadGateway;
use super::types::{CustomAction, Phase, SubmitReceipt, WorkloadStatus, WorkloadSummary};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.flowctl.dev/v1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Orchestration API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client.
    http: Client,
    /// API base URL, without a trailing slash.
    base_url: String,
    /// Bearer token.
    token: String,
}

/// `GET /workloads/{id}` response envelope.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<StatusBody>,
}

/// The `status` object inside a status response.
#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    endpoints: HashMap<String, String>,
    #[serde(default)]
    conditions: Vec<String>,
}

/// `POST /workloads/validate` response.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// `GET /workloads/{id}/logs` response.
#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: String,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Builds the URL for the workloads collection.
    fn workloads_url(&self) -> String {
        format!("{}/workloads", self.base_url)
    }

    /// Builds the URL for a single workload.
    fn workload_url(&self, workload_id: &str) -> String {
        format!("{}/workloads/{workload_id}", self.base_url)
    }

    /// Executes a request with bounded retries for transient failures.
    async fn execute(
        &self,
        build: impl Fn() -> RequestBuilder,
        resource: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.execute_once(build(), resource).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FlowctlError::Api(ApiError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Executes a single request and maps the response status.
    async fn execute_once(
        &self,
        builder: RequestBuilder,
        resource: Option<&str>,
    ) -> Result<reqwest::Response> {
        let response = builder
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| {
                FlowctlError::Api(ApiError::NetworkError {
                    message: format!("Request failed: {e}"),
                })
            })?;

        let status = response.status();
        trace!("Response status: {status}");

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(FlowctlError::Api(ApiError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(FlowctlError::Api(ApiError::AuthenticationFailed {
                message: String::from("Invalid or missing API token"),
            }));
        }

        if status.as_u16() == 404
            && let Some(workload_id) = resource
        {
            return Err(FlowctlError::Api(ApiError::NotFound {
                workload_id: workload_id.to_string(),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowctlError::Api(ApiError::request_failed(
                status.as_u16(),
                body,
            )));
        }

        Ok(response)
    }

    /// Deserializes a JSON response body.
    async fn json_body<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        response.json().await.map_err(|e| {
            FlowctlError::Api(ApiError::invalid_response(format!(
                "Failed to parse response: {e}"
            )))
        })
    }
}

#[async_trait]
impl WorkloadGateway for ApiClient {
    async fn validate(&self, spec_yaml: &str) -> Result<Vec<String>> {
        let url = format!("{}/validate", self.workloads_url());
        let body = serde_json::json!({ "spec": spec_yaml });

        let response = self.execute(|| self.http.post(&url).json(&body), None).await?;
        let parsed: ValidateResponse = Self::json_body(response).await?;
        Ok(parsed.errors)
    }

    async fn submit(&self, spec_yaml: &str, name: Option<&str>) -> Result<SubmitReceipt> {
        let url = self.workloads_url();
        let mut body = serde_json::json!({ "spec": spec_yaml });
        if let Some(name) = name {
            body["name"] = serde_json::json!(name);
        }

        debug!("POST {url}");
        let response = self.execute(|| self.http.post(&url).json(&body), None).await?;
        Self::json_body(response).await
    }

    async fn fetch_status(&self, workload_id: &str) -> Result<WorkloadStatus> {
        let url = self.workload_url(workload_id);

        let response = self
            .execute(|| self.http.get(&url), Some(workload_id))
            .await?;
        let parsed: StatusResponse = Self::json_body(response).await?;

        Ok(parsed.status.map_or_else(WorkloadStatus::default, |body| {
            WorkloadStatus {
                phase: body.phase.as_deref().and_then(Phase::parse),
                raw_phase: body.phase,
                endpoints: body.endpoints,
                conditions: body.conditions,
            }
        }))
    }

    async fn update(&self, workload_id: &str, spec_yaml: &str) -> Result<SubmitReceipt> {
        let url = self.workload_url(workload_id);
        let body = serde_json::json!({ "spec": spec_yaml });

        debug!("PUT {url}");
        let response = self
            .execute(|| self.http.put(&url).json(&body), Some(workload_id))
            .await?;
        Self::json_body(response).await
    }

    async fn custom_action(
        &self,
        workload_id: &str,
        action: CustomAction,
        replicas: Option<u32>,
    ) -> Result<SubmitReceipt> {
        let mut url = format!("{}:{}", self.workload_url(workload_id), action.verb());
        if let Some(replicas) = replicas {
            url.push_str(&format!("?replicas={replicas}"));
        }

        debug!("PUT {url}");
        let response = self
            .execute(|| self.http.put(&url), Some(workload_id))
            .await?;
        Self::json_body(response).await
    }

    async fn delete(&self, workload_id: &str) -> Result<SubmitReceipt> {
        let url = self.workload_url(workload_id);

        debug!("DELETE {url}");
        let response = self
            .execute(|| self.http.delete(&url), Some(workload_id))
            .await?;
        Self::json_body(response).await
    }

    async fn list(
        &self,
        phase: Option<&str>,
        name: Option<&str>,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<Vec<WorkloadSummary>> {
        let url = self.workloads_url();

        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(phase) = phase {
            query.push((String::from("phase"), phase.to_string()));
        }
        if let Some(name) = name {
            query.push((String::from("name"), name.to_string()));
        }
        if let Some(labels) = labels {
            for (key, value) in labels {
                query.push((String::from("labels"), format!("{key}={value}")));
            }
        }

        let response = self
            .execute(|| self.http.get(&url).query(&query), None)
            .await?;
        Self::json_body(response).await
    }

    async fn logs(&self, workload_id: &str) -> Result<String> {
        let url = format!("{}/logs", self.workload_url(workload_id));

        let response = self
            .execute(|| self.http.get(&url), Some(workload_id))
            .await?;
        let parsed: LogsResponse = Self::json_body(response).await?;
        Ok(parsed.logs)
    }
}
