use crate::HttpError;
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_API_KEY: &str = "dev-local-key";

/// Deployment settings for [`crate::ApiClient`], resolved once at start-up.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: Url,
    api_key: String,
    auth_reads: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, HttpError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|_| HttpError::InvalidBaseUrl(base_url.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(HttpError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: parsed,
            api_key: api_key.into(),
            auth_reads: false,
        })
    }

    /// Also attach the credential to read requests.
    pub fn with_auth_reads(mut self, enabled: bool) -> Self {
        self.auth_reads = enabled;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn auth_reads(&self) -> bool {
        self.auth_reads
    }

    /// Absolute URL for `segments` under the base, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Download link for a job's SARIF file. The file itself is never fetched.
    pub fn sarif_url(&self, job_id: &str) -> Result<Url, HttpError> {
        self.endpoint(&["jobs", job_id, "sarif"], &[])
    }
}
