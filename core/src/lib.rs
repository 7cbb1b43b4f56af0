//! Synchronous client core for the NS1 DNS management API.
//!
//! # Overview
//! Resource wrappers (see [`zones`]) build requests through [`Client`] and
//! hand them back to it for execution. The client runs each request through
//! a decorated [`Doer`], reports rate-limit telemetry to a pluggable
//! strategy, follows `Link: rel="next"` pagination, and turns non-2xx
//! responses into a structured [`HttpError`].
//!
//! # Design
//! - `Doer` is the only seam to the network. `UreqDoer` is the real one;
//!   tests substitute closures or the `mock-server` crate.
//! - Everything is blocking. One `execute*` call makes its round-trips one
//!   after another on the calling thread, including any rate-limit sleep.
//! - `Client` is immutable once configured and can be shared.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod link;
pub mod rate_limit;
pub mod transport;
pub mod types;
pub mod zones;

pub use client::{Client, ExecuteOptions, API_KEY_HEADER};
pub use config::Config;
pub use error::{ApiError, HttpError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use link::{parse_link, Link};
pub use rate_limit::{ConcurrentStrategy, NoopStrategy, RateLimit, RateLimitStrategy, SleepStrategy};
pub use transport::{decorate, logging, Decorator, Doer, UreqDoer};
pub use types::Zone;
pub use zones::{ZoneError, Zones};
