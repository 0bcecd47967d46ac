//! Integration tests for the LM Store storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lm-store-integration-tests
//! ```
//!
//! Every test talks to a [`MockApi`]: an in-process axum server bound to an
//! ephemeral port that answers with stubbed responses and records what it
//! received. No external services are needed.
//!
//! # Test Categories
//!
//! - `gateway` - credential injection, header precedence, 401 handling
//! - `auth` - login, registration, logout flows
//! - `cart` - cart writes and optimistic sequencing
//! - `shopping` - catalog, checkout, orders, admin inventory

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use lm_store_core::{CartItemRequest, CartLine, ProductId};
use lm_store_storefront::session::MemorySessionStore;
use lm_store_storefront::{ClientConfig, SessionCredential, StoreClient};
use serde_json::Value;

/// Path prefix the mock serves the API under, as the real backend does.
pub const API_PREFIX: &str = "/api";

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: MockBody,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum MockBody {
    Json(Value),
    Text(String),
}

impl MockResponse {
    /// A JSON response.
    #[must_use]
    pub const fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: MockBody::Json(body),
            delay: None,
        }
    }

    /// A `200 OK` JSON response.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// A plain-text response.
    #[must_use]
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: MockBody::Text(body.to_owned()),
            delay: None,
        }
    }

    /// Hold the response back for `delay` after the request is recorded.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        match self.body {
            MockBody::Json(value) => (self.status, axum::Json(value)).into_response(),
            MockBody::Text(text) => (self.status, text).into_response(),
        }
    }
}

/// One request as the mock received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path below [`API_PREFIX`], e.g. `/cart`.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

type RouteKey = (Method, String);

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<RouteKey, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cart: Mutex<Option<MockCart>>,
}

/// Server-side cart with the backend's additive semantics: adds accumulate
/// onto the line, removes drop it.
#[derive(Debug, Default)]
struct MockCart {
    lines: Vec<CartLine>,
    catalog: HashMap<ProductId, CartLine>,
}

impl MockCart {
    fn add(&mut self, item: CartItemRequest) -> bool {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity += item.quantity;
            return true;
        }
        let Some(product) = self.catalog.get(&item.product_id) else {
            return false;
        };
        self.lines.push(CartLine {
            quantity: item.quantity,
            ..product.clone()
        });
        true
    }

    fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }
}

/// A cart write the tracked cart understands.
enum CartWrite {
    Add(CartItemRequest),
    Remove(ProductId),
}

impl CartWrite {
    fn parse(method: &Method, path: &str, body: &[u8]) -> Option<Self> {
        if *method == Method::POST && path == "/cart/add" {
            return serde_json::from_slice(body).ok().map(Self::Add);
        }
        if *method == Method::DELETE {
            let id = path.strip_prefix("/cart/remove/")?;
            return id.parse().ok().map(Self::Remove);
        }
        None
    }
}

/// In-process stand-in for the remote store API.
///
/// Stubs are matched on method and path (query ignored). When several
/// responses are queued for one route they are served in order; the last one
/// keeps being served once the others are used up.
///
/// With [`MockApi::track_cart`] the mock also keeps a real cart: `GET /cart`
/// serves it, and cart writes answered with a success status change it once
/// their (possibly delayed) response is due.
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().expect("Mock API has no address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Base URL to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}{API_PREFIX}", self.addr)
    }

    /// Client configuration pointing at this mock, with no checkout delay.
    ///
    /// # Panics
    ///
    /// Panics if the generated URL is rejected.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_base_url(&self.base_url()).expect("valid mock URL");
        config.checkout_delay = Duration::ZERO;
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// A client with an in-memory session, optionally already logged in.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self, credential: Option<SessionCredential>) -> StoreClient {
        let store = credential.map_or_else(MemorySessionStore::default, MemorySessionStore::with_credential);
        StoreClient::new(self.config(), store).expect("Failed to build client")
    }

    /// Queue a response for `method path`.
    pub fn stub(&self, method: Method, path: &str, response: MockResponse) -> &Self {
        lock(&self.state.routes)
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(response);
        self
    }

    /// Keep a server-side cart seeded with `lines`. Products the seed lines
    /// name can be re-added after removal; others are answered with 404.
    pub fn track_cart(&self, lines: Vec<CartLine>) -> &Self {
        let catalog = lines
            .iter()
            .map(|line| (line.product_id, line.clone()))
            .collect();
        *lock(&self.state.cart) = Some(MockCart { lines, catalog });
        self
    }

    /// The tracked cart as the server holds it now.
    ///
    /// # Panics
    ///
    /// Panics if [`MockApi::track_cart`] was not called.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn cart(&self) -> Vec<CartLine> {
        lock(&self.state.cart)
            .as_ref()
            .map(|cart| cart.lines.clone())
            .expect("cart is not tracked")
    }

    /// Everything received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Wait until at least `count` requests have arrived.
    ///
    /// # Panics
    ///
    /// Panics after five seconds.
    pub async fn wait_for_requests(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while lock(&self.state.requests).len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} requests"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or_else(|| uri.path())
        .to_owned();

    let write = CartWrite::parse(&method, &path, &body);

    lock(&state.requests).push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(ToOwned::to_owned),
        headers,
        body,
    });

    let tracked = lock(&state.cart).is_some();
    if tracked && method == Method::GET && path == "/cart" {
        let lines = lock(&state.cart)
            .as_ref()
            .map(|cart| cart.lines.clone())
            .unwrap_or_default();
        return MockResponse::ok(serde_json::json!(lines)).into_response();
    }

    let response = {
        let mut routes = lock(&state.routes);
        routes.get_mut(&(method, path)).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    let response = match (response, &write) {
        (Some(response), _) => response,
        (None, Some(_)) if tracked => MockResponse::ok(serde_json::json!({"message": "ok"})),
        (None, _) => {
            return MockResponse::json(
                StatusCode::NOT_FOUND,
                serde_json::json!({"detail": "Not Found"}),
            )
            .into_response();
        }
    };

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    if response.status.is_success() {
        if let (Some(cart), Some(write)) = (lock(&state.cart).as_mut(), write) {
            match write {
                CartWrite::Add(item) => {
                    if !cart.add(item) {
                        return MockResponse::json(
                            StatusCode::NOT_FOUND,
                            serde_json::json!({"detail": "Product not found"}),
                        )
                        .into_response();
                    }
                }
                CartWrite::Remove(product_id) => cart.remove(product_id),
            }
        }
    }
    response.into_response()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An address nothing listens on, for transport-failure tests.
///
/// # Panics
///
/// Panics if a probe listener cannot be bound.
#[allow(clippy::expect_used)]
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Probe listener has no address");
    drop(listener);
    format!("http://{addr}{API_PREFIX}")
}
