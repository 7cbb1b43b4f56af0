//! The client core shared by every resource wrapper.
//!
//! # Design
//! A resource wrapper asks `Client` for a request (`build_request` or
//! `build_json_request`), then hands it back to one of the execute methods:
//! - `execute`: one round-trip, status checked, body left to the caller.
//! - `execute_json`: as `execute`, decoding the body into any `T`.
//! - `execute_paged`: decodes each page as `Vec<T>` and appends it to the
//!   caller's buffer, following `Link: rel="next"` while pagination is on.
//!
//! Every response runs through the rate-limit strategy before its status is
//! looked at. Pages are fetched one after another on the calling thread. A
//! failure on page N leaves pages 1..N-1 in the caller's buffer.
//!
//! `Client` is immutable once built: flags are set with the consuming
//! `with_*` methods, and pagination can be overridden per call with
//! `ExecuteOptions`, so one client can be shared across threads.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, HttpError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::link::parse_link;
use crate::rate_limit::{NoopStrategy, RateLimit, RateLimitStrategy};
use crate::transport::{decorate, logging, Doer, UreqDoer};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-NSONE-Key";

const MAX_LOGGED_BODY: usize = 256;

/// Per-call overrides of client defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub follow_pagination: bool,
}

#[derive(Clone)]
pub struct Client {
    doer: Arc<dyn Doer>,
    endpoint: Url,
    api_key: String,
    user_agent: String,
    follow_pagination: bool,
    ddi: bool,
    rate_limit: Arc<dyn RateLimitStrategy>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("user_agent", &self.user_agent)
            .field("follow_pagination", &self.follow_pagination)
            .field("ddi", &self.ddi)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client sending through `doer`, which should already carry any
    /// decorators and timeouts the caller wants.
    pub fn new(doer: Arc<dyn Doer>, config: &Config) -> Result<Self, ApiError> {
        Ok(Self {
            doer,
            endpoint: parse_endpoint(&config.endpoint)?,
            api_key: config.api_key.clone(),
            user_agent: config.user_agent.clone(),
            follow_pagination: config.follow_pagination,
            ddi: config.ddi,
            rate_limit: Arc::new(NoopStrategy),
        })
    }

    /// Client over the network, with request logging.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let base = Arc::new(UreqDoer::with_timeout(config.timeout()));
        Self::new(decorate(base, vec![logging()]), config)
    }

    pub fn with_rate_limit_strategy(mut self, strategy: impl RateLimitStrategy + 'static) -> Self {
        self.rate_limit = Arc::new(strategy);
        self
    }

    pub fn with_follow_pagination(mut self, follow: bool) -> Self {
        self.follow_pagination = follow;
        self
    }

    pub fn with_ddi(mut self, ddi: bool) -> Self {
        self.ddi = ddi;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn follow_pagination(&self) -> bool {
        self.follow_pagination
    }

    /// Whether resource wrappers should use DDI payload shapes.
    pub fn is_ddi(&self) -> bool {
        self.ddi
    }

    pub fn default_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            follow_pagination: self.follow_pagination,
        }
    }

    /// Request without a body for `path`, resolved against the endpoint.
    ///
    /// `path` may repeat the endpoint's own path prefix (`v1/zones` against
    /// `.../v1/`), may start with `/`, and may contain doubled separators;
    /// all resolve to the same URL. Absolute URLs are used as they are.
    pub fn build_request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, ApiError> {
        let url = self.resolve(path)?;
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers: vec![
                (API_KEY_HEADER.to_string(), self.api_key.clone()),
                ("User-Agent".to_string(), self.user_agent.clone()),
            ],
            body: None,
        })
    }

    /// Request carrying `body` serialized as JSON.
    pub fn build_json_request<B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        let mut request = self.build_request(method, path)?;
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }

    /// Send `request` once. Non-2xx statuses become `ApiError::Http`.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.doer.do_request(request)?;
        if let Some(rate_limit) = RateLimit::from_response(&response) {
            log::debug!(
                "rate limit: {}/{} left per {}s ({}%)",
                rate_limit.remaining,
                rate_limit.limit,
                rate_limit.period,
                rate_limit.percentage_left()
            );
            self.rate_limit.on_rate_limit(&rate_limit);
        }
        check_status(request, response)
    }

    /// Send `request` once and decode a successful body as `T`.
    pub fn execute_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<(T, HttpResponse), ApiError> {
        let response = self.execute(request)?;
        let value = decode(&response)?;
        Ok((value, response))
    }

    /// Send `request` and append the decoded items to `into`, following
    /// `next` links when the client follows pagination.
    pub fn execute_paged<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        into: &mut Vec<T>,
    ) -> Result<HttpResponse, ApiError> {
        self.execute_paged_with(request, into, self.default_options())
    }

    /// `execute_paged` with explicit options.
    ///
    /// Returns the last page's response. When pagination is not followed
    /// that is the first page, with its `Link` header intact.
    pub fn execute_paged_with<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        into: &mut Vec<T>,
        options: ExecuteOptions,
    ) -> Result<HttpResponse, ApiError> {
        let mut response = self.execute(request)?;
        into.extend(decode::<Vec<T>>(&response)?);
        if !options.follow_pagination {
            return Ok(response);
        }

        let mut visited = HashSet::from([request.url.clone()]);
        let mut current = request.url.clone();
        while let Some(next) = next_link(&response) {
            let page = next_page_request(request, &current, &next)?;
            if !visited.insert(page.url.clone()) {
                return Err(ApiError::PaginationLoop { url: page.url });
            }
            log::debug!("following next page {}", page.url);
            response = self.execute(&page)?;
            into.extend(decode::<Vec<T>>(&response)?);
            current = page.url;
        }
        Ok(response)
    }

    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if let Ok(url) = Url::parse(path) {
            if url.has_host() {
                return Ok(url);
            }
        }

        let (path_part, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let segments: Vec<&str> = path_part.split('/').filter(|s| !s.is_empty()).collect();
        let prefix: Vec<&str> = self
            .endpoint
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let rest = if segments.starts_with(&prefix) {
            &segments[prefix.len()..]
        } else {
            &segments[..]
        };

        // "./" keeps a first segment containing ':' from reading as a scheme.
        let mut relative = format!("./{}", rest.join("/"));
        if path_part.ends_with('/') && !rest.is_empty() {
            relative.push('/');
        }
        if let Some(query) = query {
            relative.push('?');
            relative.push_str(query);
        }
        self.endpoint
            .join(&relative)
            .map_err(|source| ApiError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }
}

/// Same method and headers as `first`, targeting `next` resolved against the
/// URL of the page that advertised it, no body.
fn next_page_request(first: &HttpRequest, current: &str, next: &str) -> Result<HttpRequest, ApiError> {
    let invalid = |source| ApiError::InvalidPath {
        path: next.to_string(),
        source,
    };
    let url = Url::parse(current).and_then(|base| base.join(next)).map_err(invalid)?;
    Ok(HttpRequest {
        method: first.method,
        url: url.into(),
        headers: first
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("Content-Type"))
            .cloned()
            .collect(),
        body: None,
    })
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ApiError> {
    let invalid = |source| ApiError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    };
    let mut url = Url::parse(endpoint).map_err(invalid)?;
    if url.cannot_be_a_base() {
        return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn check_status(request: &HttpRequest, response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let err = HttpError::from_response(request, response);
    log::debug!("{err}");
    Err(err.into())
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body).map_err(|source| {
        let body = truncate_for_log(&response.body_text());
        log::error!("response decode failed: {source}; body: {body}");
        ApiError::Decode { source, body }
    })
}

fn next_link(response: &HttpResponse) -> Option<String> {
    response
        .header_values("Link")
        .find_map(|value| parse_link(value).next().map(str::to_string))
}

fn truncate_for_log(s: &str) -> String {
    if s.len() <= MAX_LOGGED_BODY {
        return s.to_string();
    }
    let mut end = MAX_LOGGED_BODY;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, total {} bytes]", &s[..end], s.len())
}
