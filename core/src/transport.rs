//! The transport capability and the decorators composed around it.
//!
//! # Design
//! A `Doer` is the single-method contract "request in, response or failure
//! out". `UreqDoer` is the network-backed implementation; anything else the
//! client needs around the wire (logging, instrumentation, test doubles) is a
//! `Decorator`: a function taking one `Doer` and returning another.
//! `decorate` folds a list of decorators over a base, so the last decorator
//! listed is the outermost one and sees every request first.
//!
//! Decorated doers hold their inner doer through an `Arc`, so several chains
//! can share one base transport. Every doer must be reentrant.

use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP request.
pub trait Doer: Send + Sync {
    fn do_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Doer for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn do_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Wraps a `Doer` into another `Doer`.
pub type Decorator = Box<dyn Fn(Arc<dyn Doer>) -> Arc<dyn Doer> + Send + Sync>;

/// Apply `decorators` to `base` in order.
pub fn decorate<I>(base: Arc<dyn Doer>, decorators: I) -> Arc<dyn Doer>
where
    I: IntoIterator<Item = Decorator>,
{
    decorators
        .into_iter()
        .fold(base, |doer, decorator| decorator(doer))
}

/// Decorator that logs method, URL and user agent of every request at debug
/// level before delegating. Requests and responses pass through untouched.
pub fn logging() -> Decorator {
    Box::new(|inner: Arc<dyn Doer>| Arc::new(LoggingDoer { inner }) as Arc<dyn Doer>)
}

struct LoggingDoer {
    inner: Arc<dyn Doer>,
}

impl Doer for LoggingDoer {
    fn do_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        log::debug!(
            "{} {} {}",
            request.method,
            request.url,
            request.header("User-Agent").unwrap_or("")
        );
        self.inner.do_request(request)
    }
}

/// Network transport backed by a blocking `ureq` agent.
///
/// Non-2xx statuses are returned as responses, not errors; status
/// interpretation belongs to the client.
#[derive(Debug, Clone)]
pub struct UreqDoer {
    agent: ureq::Agent,
}

impl UreqDoer {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// A transport whose every call gives up after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqDoer {
    fn default() -> Self {
        Self::new()
    }
}

impl Doer for UreqDoer {
    fn do_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let sent = match &request.body {
            Some(body) => {
                let req = builder.body(body.as_slice()).map_err(TransportError::other)?;
                self.agent.run(req)
            }
            None => {
                let req = builder.body(()).map_err(TransportError::other)?;
                self.agent.run(req)
            }
        };
        let mut response = sent.map_err(map_ureq_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // ureq caps reads at 10 MiB by default; a large page is still a response.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_ureq_error(e: ureq::Error) -> TransportError {
    match e {
        ureq::Error::Timeout(_) => TransportError::Timeout(Box::new(e)),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed | ureq::Error::Io(_) => {
            TransportError::Connect(Box::new(e))
        }
        other => TransportError::Other(Box::new(other)),
    }
}
