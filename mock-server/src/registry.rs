//! Test-case registry and the request matcher.
//!
//! # Design
//! Test cases are keyed by method and by normalized URI (path plus query,
//! always under [`API_PREFIX`]). Each key holds candidates in registration
//! order. A request matches a candidate when its body equals the expected
//! body and it carries every expected header value; extra request headers
//! are ignored. The first matching candidate wins.
//!
//! JSON bodies are compared in canonical form (parsed and re-serialized), so
//! key order and whitespace do not matter. Anything else compares byte for
//! byte.
//!
//! Matching is pure and synchronous: the same registry and the same request
//! always produce the same response.

use std::collections::{BTreeMap, HashMap};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::error::MockError;

/// Every registered and served path lives under this prefix.
pub const API_PREFIX: &str = "/v1/";

/// A request or response body as given at registration.
///
/// Bytes and strings are used as they are; other JSON values are serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Raw(Vec<u8>),
    Json(Value),
}

impl Payload {
    fn into_bytes(self) -> Result<Vec<u8>, MockError> {
        match self {
            Payload::Empty | Payload::Json(Value::Null) => Ok(Vec::new()),
            Payload::Raw(bytes) => Ok(bytes),
            Payload::Json(Value::String(s)) => Ok(s.into_bytes()),
            Payload::Json(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Raw(s.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Raw(s.into_bytes())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// One expected request and the response to replay for it.
#[derive(Debug, Clone)]
pub struct TestCase {
    method: String,
    path: String,
    status: u16,
    request_headers: Vec<(String, String)>,
    response_headers: Vec<(String, String)>,
    request_body: Payload,
    response_body: Payload,
}

impl TestCase {
    /// Expect `method` on `path`, replying `200` with an empty body.
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            status: 200,
            request_headers: Vec::new(),
            response_headers: Vec::new(),
            request_body: Payload::Empty,
            response_body: Payload::Empty,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Require the request to carry `name: value`. May be repeated, also
    /// for the same name.
    pub fn request_header(mut self, name: &str, value: &str) -> Self {
        self.request_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add `name: value` to the reply. Repeating a name sends several values.
    pub fn response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn request_body(mut self, body: impl Into<Payload>) -> Self {
        self.request_body = body.into();
        self
    }

    pub fn response_body(mut self, body: impl Into<Payload>) -> Self {
        self.response_body = body.into();
        self
    }
}

/// A request as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub method: String,
    /// Path and query, e.g. `/v1/zones?page=2`.
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A response to write back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Why a request matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmatched {
    Method,
    Uri,
    NoTest,
}

impl Unmatched {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unmatched::Method => "method",
            Unmatched::Uri => "uri",
            Unmatched::NoTest => "no test",
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    headers: BTreeMap<String, Vec<String>>,
    body: Vec<u8>,
    response: MockResponse,
}

impl Candidate {
    fn accepts(&self, body: &[u8], headers: &BTreeMap<String, Vec<String>>) -> bool {
        self.body == body
            && self.headers.iter().all(|(name, expected)| {
                headers
                    .get(name)
                    .is_some_and(|actual| expected.iter().all(|v| actual.contains(v)))
            })
    }
}

/// Registered test cases. Not synchronized; wrap it to share it.
#[derive(Debug, Default)]
pub struct Registry {
    cases: HashMap<String, HashMap<String, Vec<Candidate>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `case`.
    ///
    /// Fails if a case with the same method, path, expected headers and
    /// expected body is already registered, or if the reply's status or
    /// headers are not valid HTTP.
    pub fn add_test_case(&mut self, case: TestCase) -> Result<(), MockError> {
        if StatusCode::from_u16(case.status).is_err() {
            return Err(MockError::InvalidStatus(case.status));
        }
        for (name, value) in case.request_headers.iter().chain(&case.response_headers) {
            if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
                return Err(MockError::InvalidHeader { name: name.clone() });
            }
        }

        let path = normalize_path(&case.path);
        let candidate = Candidate {
            headers: group_headers(&case.request_headers),
            body: canonical_body(case.request_body.into_bytes()?),
            response: MockResponse {
                status: case.status,
                headers: case.response_headers,
                body: case.response_body.into_bytes()?,
            },
        };

        let candidates = self
            .cases
            .entry(case.method.clone())
            .or_default()
            .entry(path.clone())
            .or_default();
        if candidates
            .iter()
            .any(|c| c.headers == candidate.headers && c.body == candidate.body)
        {
            return Err(MockError::Duplicate {
                method: case.method,
                path,
            });
        }
        candidates.push(candidate);
        Ok(())
    }

    /// Register several cases, stopping at the first failure.
    pub fn add_test_cases(&mut self, cases: impl IntoIterator<Item = TestCase>) -> Result<(), MockError> {
        cases.into_iter().try_for_each(|case| self.add_test_case(case))
    }

    pub fn clear(&mut self) {
        self.cases.clear();
    }

    /// Number of registered cases.
    pub fn len(&self) -> usize {
        self.cases
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registered response for `request`, or why there is none.
    pub fn find(&self, request: &MockRequest) -> Result<&MockResponse, Unmatched> {
        let by_uri = self
            .cases
            .get(&request.method.to_ascii_uppercase())
            .ok_or(Unmatched::Method)?;
        let candidates = by_uri
            .get(&normalize_path(&request.uri))
            .ok_or(Unmatched::Uri)?;
        let body = canonical_body(request.body.clone());
        let headers = group_headers(&request.headers);
        candidates
            .iter()
            .find(|c| c.accepts(&body, &headers))
            .map(|c| &c.response)
            .ok_or(Unmatched::NoTest)
    }

    /// The registered response for `request`, or a 404 whose JSON body tags
    /// the reason as `method`, `uri` or `no test`.
    pub fn serve(&self, request: &MockRequest) -> MockResponse {
        match self.find(request) {
            Ok(response) => response.clone(),
            Err(reason) => {
                log::warn!("mock: {} {} unmatched ({})", request.method, request.uri, reason.as_str());
                unmatched_response(request, reason)
            }
        }
    }
}

fn unmatched_response(request: &MockRequest, reason: Unmatched) -> MockResponse {
    let message = match reason {
        Unmatched::Method => format!("no test cases for method {}", request.method),
        Unmatched::Uri => format!("no test cases for {} {}", request.method, request.uri),
        Unmatched::NoTest => format!("no test case matches headers and body of {} {}", request.method, request.uri),
    };
    let body = json!({ "message": message, "reason": reason.as_str() });
    MockResponse {
        status: 404,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string().into_bytes(),
    }
}

/// `zones`, `/zones` and `/v1/zones` all become `/v1/zones`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let version = API_PREFIX.trim_matches('/');
    let rest = match trimmed.strip_prefix(version) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with('?') => rest.trim_start_matches('/'),
        _ => trimmed,
    };
    format!("{API_PREFIX}{rest}")
}

fn group_headers(headers: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        grouped
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.clone());
    }
    grouped
}

fn canonical_body(bytes: Vec<u8>) -> Vec<u8> {
    if bytes.is_empty() {
        return bytes;
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => serde_json::to_vec(&value).unwrap_or(bytes),
        Err(_) => bytes,
    }
}
