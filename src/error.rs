//! Error type shared by the library modules

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The upstream API asked us to slow down (HTTP 429).
    #[error("rate limited by upstream API{}", retry_after_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// A comment referenced a parent that is neither the submission nor an
    /// already synced comment.
    #[error("comment {comment} references parent {parent} which has not been synced")]
    OrderingViolation { comment: String, parent: String },

    #[error("invalid identifier kind: {0}")]
    InvalidKind(String),

    #[error("invalid field type tag: {0}")]
    InvalidFieldType(String),

    #[error("upstream API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("language model error: {0}")]
    Model(String),

    #[error("model output does not match response format: {0}")]
    SchemaMismatch(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

/// Pass successful responses through; map 429 to `RateLimited` and any
/// other failure status to `Upstream` with the body text
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        // Reddit sends fractional seconds
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(|secs| secs.ceil() as u64);
        return Err(Error::RateLimited { retry_after_secs });
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        status: status.as_u16(),
        body,
    })
}

fn retry_after_suffix(secs: &Option<u64>) -> String {
    match secs {
        Some(s) => format!(" (retry after {}s)", s),
        None => String::new(),
    }
}
