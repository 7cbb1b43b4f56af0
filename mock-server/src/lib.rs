//! In-process stand-in for the NS1 API.
//!
//! # Overview
//! Tests register expected requests with canned responses ([`TestCase`]),
//! then point a client at [`MockServer::url`]. Each incoming request is
//! matched against the registry by method, path, headers and body; the first
//! match's response is replayed verbatim. Unmatched requests get a 404 whose
//! JSON body says why (`method`, `uri` or `no test`).
//!
//! # Design
//! - `registry` is the pure matcher and knows nothing about HTTP servers.
//! - `server` puts it behind axum, either as a `Router` for `tower` tests or
//!   as a threaded `MockServer` for blocking clients.
//! - `fixture` loads test cases from JSON files for the standalone binary.

pub mod error;
pub mod fixture;
pub mod registry;
pub mod server;

pub use error::MockError;
pub use registry::{normalize_path, MockRequest, MockResponse, Payload, Registry, TestCase, Unmatched, API_PREFIX};
pub use server::{app, app_with_timer, lock, run, MockServer, ServeTimer, SharedRegistry};
