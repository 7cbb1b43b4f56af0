//! Test cases loaded from JSON files.
//!
//! A fixture file is an array of objects:
//!
//! ```json
//! [
//!   {
//!     "method": "GET",
//!     "path": "zones",
//!     "status": 200,
//!     "request_headers": [["X-NSONE-Key", "secret"]],
//!     "response_headers": [["Link", "<http://localhost:3000/v1/zones?page=2>; rel=\"next\""]],
//!     "response_body": [{"zone": "a.com"}]
//!   }
//! ]
//! ```
//!
//! Bodies follow the registration rules: a JSON string is sent as is, any
//! other value is serialized.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::MockError;
use crate::registry::TestCase;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub method: String,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub request_headers: Vec<(String, String)>,
    #[serde(default)]
    pub response_headers: Vec<(String, String)>,
    #[serde(default)]
    pub request_body: Value,
    #[serde(default)]
    pub response_body: Value,
}

fn default_status() -> u16 {
    200
}

impl From<Fixture> for TestCase {
    fn from(f: Fixture) -> Self {
        let mut case = TestCase::new(&f.method, &f.path)
            .status(f.status)
            .request_body(f.request_body)
            .response_body(f.response_body);
        for (name, value) in &f.request_headers {
            case = case.request_header(name, value);
        }
        for (name, value) in &f.response_headers {
            case = case.response_header(name, value);
        }
        case
    }
}

pub fn parse(json: &str) -> Result<Vec<TestCase>, serde_json::Error> {
    let fixtures: Vec<Fixture> = serde_json::from_str(json)?;
    Ok(fixtures.into_iter().map(TestCase::from).collect())
}

pub fn load(path: &Path) -> Result<Vec<TestCase>, MockError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| MockError::FixtureIo {
        path: display.clone(),
        source,
    })?;
    parse(&raw).map_err(|source| MockError::FixtureParse {
        path: display,
        source,
    })
}
