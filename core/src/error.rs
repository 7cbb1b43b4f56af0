//! Error types for the API client.
//!
//! # Design
//! Three families are kept apart so callers can tell "the server said no"
//! from "we could not talk to it correctly":
//! - `TransportError`: the request never produced a response.
//! - `ApiError::Encode` / `ApiError::Decode`: JSON on either side was unusable.
//! - `HttpError`: any non-2xx response, with status, best-effort message and
//!   the raw response. Mapping these onto resource-specific sentinel errors is
//!   left to resource wrappers.

use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure raised by a `Doer` before any HTTP response was available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("transport error: {0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    pub fn other(e: impl Into<BoxError>) -> Self {
        TransportError::Other(e.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// A non-2xx response.
#[derive(Debug, Clone, Error)]
#[error("{method} {url}: {status} {message}")]
pub struct HttpError {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    /// The `message` field of a JSON body, or empty.
    pub message: String,
    pub response: HttpResponse,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpError {
    pub fn from_response(request: &HttpRequest, response: HttpResponse) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(&response.body)
            .map(|b| b.message)
            .unwrap_or_default();
        Self {
            method: request.method,
            url: request.url.clone(),
            status: response.status,
            message,
            response,
        }
    }
}

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid request path {path:?}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {source} (body: {body})")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Http(Box<HttpError>),

    #[error("pagination loop: next link {url} was already fetched")]
    PaginationLoop { url: String },
}

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        ApiError::Http(Box::new(e))
    }
}

impl ApiError {
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            ApiError::Http(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.http().map(|e| e.status)
    }

    /// Parsed server message, when the error came from a response.
    pub fn message(&self) -> Option<&str> {
        self.http().map(|e| e.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Put,
            url: "https://api.nsone.net/v1/zones/example.com".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn message_is_read_from_json_body() {
        let err = HttpError::from_response(&request(), response(400, r#"{"message":"zone already exists"}"#));
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "zone already exists");
        assert_eq!(
            err.to_string(),
            "PUT https://api.nsone.net/v1/zones/example.com: 400 zone already exists"
        );
    }

    #[test]
    fn unparsable_body_gives_empty_message_and_keeps_raw() {
        let err = HttpError::from_response(&request(), response(502, "<html>bad gateway</html>"));
        assert_eq!(err.message, "");
        assert_eq!(err.response.body_text(), "<html>bad gateway</html>");
    }

    #[test]
    fn non_string_message_is_ignored() {
        let err = HttpError::from_response(&request(), response(400, r#"{"message":42}"#));
        assert_eq!(err.message, "");
    }

    #[test]
    fn api_error_exposes_status_and_message() {
        let err: ApiError = HttpError::from_response(&request(), response(404, r#"{"message":"zone not found"}"#)).into();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), Some("zone not found"));

        let err = ApiError::Transport(TransportError::other("boom"));
        assert_eq!(err.status(), None);
        assert!(err.http().is_none());
    }
}
