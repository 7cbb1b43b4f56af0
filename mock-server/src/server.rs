//! HTTP front end for the registry.
//!
//! `app` exposes a shared [`Registry`] as an axum router: every request,
//! whatever its method or path, goes to the matcher. `MockServer` runs that
//! router on an ephemeral local port on a background thread so blocking
//! clients can talk to it from ordinary `#[test]` functions.
//!
//! The registry is meant to be filled before traffic starts. The mutex only
//! makes the handle shareable with the server thread.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::error::MockError;
use crate::registry::{MockRequest, MockResponse, Registry, TestCase, API_PREFIX};

pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Hook paused around every served request, so benchmark timers only
/// measure the client under test.
pub trait ServeTimer: Send + Sync {
    fn stop(&self);
    fn start(&self);
}

struct Paused<'a>(&'a dyn ServeTimer);

impl<'a> Paused<'a> {
    fn new(timer: &'a dyn ServeTimer) -> Self {
        timer.stop();
        Paused(timer)
    }
}

impl Drop for Paused<'_> {
    fn drop(&mut self) {
        self.0.start();
    }
}

#[derive(Clone)]
struct AppState {
    registry: SharedRegistry,
    timer: Option<Arc<dyn ServeTimer>>,
}

pub fn lock(registry: &SharedRegistry) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn app(registry: SharedRegistry) -> Router {
    app_with_timer(registry, None)
}

pub fn app_with_timer(registry: SharedRegistry, timer: Option<Arc<dyn ServeTimer>>) -> Router {
    Router::new()
        .fallback(serve_request)
        .with_state(AppState { registry, timer })
}

pub async fn run(listener: TcpListener, registry: SharedRegistry) -> Result<(), io::Error> {
    axum::serve(listener, app(registry)).await
}

async fn serve_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let _paused = state.timer.as_deref().map(Paused::new);

    let request = MockRequest {
        method: method.as_str().to_string(),
        uri: uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                Err(_) => {
                    log::debug!("mock: {method} {uri}: ignoring non-UTF-8 value of header {name}");
                    None
                }
            })
            .collect(),
        body: body.to_vec(),
    };
    let response = lock(&state.registry).serve(&request);
    log::debug!("mock: {} {} -> {}", request.method, request.uri, response.status);
    into_response(response)
}

fn into_response(response: MockResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            headers.append(name, value);
        }
    }
    (status, headers, Body::from(response.body)).into_response()
}

/// A mock API listening on `127.0.0.1` on a background thread.
///
/// Dropping the handle stops the server.
pub struct MockServer {
    addr: SocketAddr,
    registry: SharedRegistry,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub fn start() -> io::Result<Self> {
        Self::start_with_timer(None)
    }

    pub fn start_with_timer(timer: Option<Arc<dyn ServeTimer>>) -> io::Result<Self> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let registry = SharedRegistry::default();
        let router = app_with_timer(registry.clone(), timer);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, rx) = oneshot::channel::<()>();

        thread::Builder::new()
            .name(format!("mock-server-{}", addr.port()))
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match TcpListener::from_std(std_listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            log::error!("mock server on {addr} failed to start: {e}");
                            return;
                        }
                    };
                    let shutdown = async move {
                        let _ = rx.await;
                    };
                    if let Err(e) = axum::serve(listener, router)
                        .with_graceful_shutdown(shutdown)
                        .await
                    {
                        log::error!("mock server on {addr} stopped: {e}");
                    }
                })
            })?;

        Ok(Self {
            addr,
            registry,
            shutdown: Some(tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL including the API prefix, e.g. `http://127.0.0.1:4321/v1/`.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    pub fn add_test_case(&self, case: TestCase) -> Result<(), MockError> {
        lock(&self.registry).add_test_case(case)
    }

    pub fn add_test_cases(&self, cases: impl IntoIterator<Item = TestCase>) -> Result<(), MockError> {
        lock(&self.registry).add_test_cases(cases)
    }

    /// Forget every registered case. Not done automatically between tests.
    pub fn clear_test_cases(&self) {
        lock(&self.registry).clear();
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
