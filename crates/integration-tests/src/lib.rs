//! Integration tests for ShopHub.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (storefront router over the in-memory backend)
//! cargo test -p shophub-integration-tests
//!
//! # Live tests against a running storefront
//! STOREFRONT_TEST_URL=http://localhost:3000 cargo test -p shophub-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_pages` - Listing, grid fragment and product detail
//! - `auth_flow` - Sign-in, sign-up, sign-out and session refresh
//! - `cart_flow` - Add, merge, update, remove and the count badge
//! - `live_server` - Smoke tests against a deployed storefront

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use shophub_core::{Email, Product, UserId};
use shophub_storefront::backend::memory::MemoryBackend;
use shophub_storefront::config::{BackendConfig, StorefrontConfig};
use shophub_storefront::middleware::create_session_layer;
use shophub_storefront::middleware::session::SESSION_COOKIE_NAME;
use shophub_storefront::routes;
use shophub_storefront::state::AppState;

/// Password used by [`TestApp::sign_in_new_user`].
pub const TEST_PASSWORD: &str = "secret-pass-1";

/// Configuration for an in-process storefront (plain HTTP, no Sentry).
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/shophub_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            url: Url::parse("http://backend.test").unwrap(),
            anon_key: SecretString::from("test-anon-key"),
            product_cache_ttl: Duration::ZERO,
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A response with its body read into a string.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header (plain redirects).
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The `HX-Redirect` header.
    #[must_use]
    pub fn hx_redirect(&self) -> Option<&str> {
        self.headers.get("HX-Redirect").and_then(|v| v.to_str().ok())
    }

    /// The decoded `HX-Trigger` header.
    #[must_use]
    pub fn hx_trigger(&self) -> Option<serde_json::Value> {
        self.headers
            .get("HX-Trigger")
            .map(|v| serde_json::from_slice(v.as_bytes()).unwrap())
    }

    /// Title of the toast carried in `HX-Trigger`, if any.
    #[must_use]
    pub fn toast_title(&self) -> Option<String> {
        self.hx_trigger()
            .and_then(|t| t["toast"]["title"].as_str().map(str::to_string))
    }

    /// Whether `HX-Trigger` fires `cart-updated`.
    #[must_use]
    pub fn fires_cart_updated(&self) -> bool {
        self.hx_trigger()
            .is_some_and(|t| t.get("cart-updated").is_some())
    }
}

/// The storefront router over a [`MemoryBackend`], with one browser's
/// session cookie carried between requests.
pub struct TestApp {
    pub backend: Arc<MemoryBackend>,
    router: Router,
    cookie: Mutex<Option<String>>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = test_config();
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::new(config.clone(), backend.clone(), None);
        let router = routes::routes()
            .with_state(state)
            .layer(create_session_layer(MemoryStore::default(), &config));

        Self {
            backend,
            router,
            cookie: Mutex::new(None),
        }
    }

    /// Add a product to the backend's catalog.
    pub async fn product(&self, name: &str, price: &str, stock: u32) -> Product {
        self.backend
            .add_product(name, price.parse::<Decimal>().unwrap(), stock)
            .await
    }

    /// Register a user and sign this browser in as them.
    pub async fn sign_in_new_user(&self, email: &str) -> UserId {
        let user_id = self
            .backend
            .register_user(&Email::parse(email).unwrap(), TEST_PASSWORD)
            .await;
        let response = self
            .post_form("/auth/sign-in", &[("email", email), ("password", TEST_PASSWORD)])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        user_id
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    pub async fn htmx_get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path).header("HX-Request", "true"), Body::empty())
            .await
    }

    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let builder = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(encode(fields))).await
    }

    pub async fn htmx_post(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let builder = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("HX-Request", "true");
        self.send(builder, Body::from(encode(fields))).await
    }

    async fn send(&self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = self.cookie.lock().unwrap().clone() {
            builder = builder.header(header::COOKIE, cookie);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let pair = value.split(';').next().unwrap_or_default();
            if pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")) {
                *self.cookie.lock().unwrap() = Some(pair.to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}
