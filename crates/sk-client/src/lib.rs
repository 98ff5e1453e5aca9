//! Typed HTTP transport for the scanning service.
//!
//! Reads go out bare, writes and webhook administration carry the static
//! `X-API-Key` credential. Any non-success status becomes [`HttpError::Status`]
//! holding the response body text. There is no retry, timeout or backoff here;
//! pacing belongs to callers.

mod config;
mod error;

pub use config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_API_KEY};
pub use error::HttpError;

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use sk_core::{
    BaselineDiff, CreateJobRequest, CreateJobResponse, ExportFormat, ExportPayload, Health, Job,
    JobResults, JobSummary, SnippetDetail, SnippetEntry, SnippetKey, Stats, SuppressRequest,
    Suppression, SuppressionAck, Webhook, WebhookDeleted, WebhookRequest,
};
use tracing::{debug, warn};
use url::Url;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        self.get_with_key(segments, query, self.config.auth_reads())
            .await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, HttpError> {
        let url = self.config.endpoint(segments, &[])?;
        let request = self.request(Method::POST, url.clone(), true).json(body);
        self.send(Method::POST, &url, request).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, HttpError> {
        let url = self.config.endpoint(segments, &[])?;
        let request = self.request(Method::DELETE, url.clone(), true);
        self.send(Method::DELETE, &url, request).await
    }

    pub async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<CreateJobResponse, HttpError> {
        self.post_json(&["jobs"], request).await
    }

    pub async fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<JobSummary>, HttpError> {
        match limit {
            Some(limit) => {
                let limit = limit.to_string();
                self.get_json(&["jobs"], &[("limit", limit.as_str())]).await
            }
            None => self.get_json(&["jobs"], &[]).await,
        }
    }

    pub async fn job(&self, job_id: &str) -> Result<Job, HttpError> {
        self.get_json(&["jobs", job_id], &[]).await
    }

    pub async fn job_results(&self, job_id: &str) -> Result<JobResults, HttpError> {
        self.get_json(&["jobs", job_id, "results"], &[]).await
    }

    pub fn sarif_url(&self, job_id: &str) -> Result<Url, HttpError> {
        self.config.sarif_url(job_id)
    }

    pub async fn export(
        &self,
        job_id: &str,
        format: ExportFormat,
    ) -> Result<ExportPayload, HttpError> {
        self.get_json(&["jobs", job_id, "export"], &[("format", format.as_str())])
            .await
    }

    pub async fn diff(&self, job_id: &str, baseline_job_id: &str) -> Result<BaselineDiff, HttpError> {
        self.get_json(
            &["jobs", job_id, "diff"],
            &[("baseline_job_id", baseline_job_id)],
        )
        .await
    }

    pub async fn suppressions(&self) -> Result<Vec<Suppression>, HttpError> {
        self.get_json(&["jobs", "suppressions"], &[]).await
    }

    pub async fn suppress(
        &self,
        fingerprint: &str,
        request: &SuppressRequest,
    ) -> Result<SuppressionAck, HttpError> {
        self.post_json(&["jobs", "findings", fingerprint, "suppress"], request)
            .await
    }

    pub async fn unsuppress(&self, fingerprint: &str) -> Result<SuppressionAck, HttpError> {
        self.delete_json(&["jobs", "findings", fingerprint, "suppress"])
            .await
    }

    pub async fn stats(&self) -> Result<Stats, HttpError> {
        self.get_json(&["stats"], &[]).await
    }

    pub async fn list_snippets(&self) -> Result<Vec<SnippetEntry>, HttpError> {
        self.get_json(&["snippets"], &[]).await
    }

    pub async fn snippet(&self, key: &SnippetKey) -> Result<SnippetDetail, HttpError> {
        self.get_json(&["snippets", &key.language, &key.name], &[])
            .await
    }

    pub async fn health(&self) -> Result<Health, HttpError> {
        self.get_json(&["health"], &[]).await
    }

    /// Webhook administration is credentialed in both directions.
    pub async fn webhooks(&self) -> Result<Vec<Webhook>, HttpError> {
        self.get_with_key(&["webhooks"], &[], true).await
    }

    pub async fn create_webhook(&self, request: &WebhookRequest) -> Result<Webhook, HttpError> {
        self.post_json(&["webhooks"], request).await
    }

    pub async fn delete_webhook(&self, webhook_id: u64) -> Result<WebhookDeleted, HttpError> {
        let id = webhook_id.to_string();
        self.delete_json(&["webhooks", &id]).await
    }

    async fn get_with_key<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        with_key: bool,
    ) -> Result<T, HttpError> {
        let url = self.config.endpoint(segments, query)?;
        let request = self.request(Method::GET, url.clone(), with_key);
        self.send(Method::GET, &url, request).await
    }

    fn request(&self, method: Method, url: Url, with_key: bool) -> RequestBuilder {
        let request = self.http.request(method, url);
        if with_key {
            request.header(API_KEY_HEADER, self.config.api_key())
        } else {
            request
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<T, HttpError> {
        debug!(event = "api_request", method = %method, url = %url);
        let response = request.send().await.map_err(|err| {
            warn!(event = "api_transport_error", method = %method, url = %url, error = %err);
            HttpError::from(err)
        })?;
        decode_response(&method, url, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    method: &Method,
    url: &Url,
    response: Response,
) -> Result<T, HttpError> {
    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(text) => text,
            Err(err) => err.to_string(),
        };
        warn!(
            event = "api_status_error",
            method = %method,
            url = %url,
            status = status.as_u16()
        );
        return Err(HttpError::status(status.as_u16(), body));
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| {
        warn!(event = "api_decode_error", method = %method, url = %url, error = %err);
        HttpError::Decode(err.to_string())
    })
}
