use thiserror::Error;

/// Every way a request to the scanning service can fail.
///
/// `Status` displays the server's body text and nothing else, so views can
/// show it verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid api base url '{0}'")]
    InvalidBaseUrl(String),
}

impl HttpError {
    pub(crate) fn status(status: u16, body: String) -> Self {
        let body = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            body
        };
        HttpError::Status { status, body }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::Transport(err.to_string())
    }
}
