//! HTTP client for the hosted backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use shophub_core::{
    CartLine, CartLineId, CartProduct, Email, NewProduct, Product, ProductId, Quantity, UserId,
};

use super::{Backend, BackendError, ProductCache, SignUpOutcome};
use crate::config::BackendConfig;
use crate::models::{AuthSession, SessionUser};

/// Columns selected for a cart line, with the product summary embedded.
const CART_LINE_SELECT: &str = "id,user_id,product_id,quantity,product:products(id,name,price,image_url)";

/// Longest response body excerpt written to the logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

/// Sign-up returns a full session when no confirmation is needed, and just
/// the user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// A `cart_items` row as read. The product embed is `null` when the
/// product row no longer exists.
#[derive(Deserialize)]
struct CartRow {
    id: CartLineId,
    user_id: UserId,
    product_id: ProductId,
    quantity: Quantity,
    product: Option<CartProduct>,
}

impl CartRow {
    fn into_line(self) -> Option<CartLine> {
        let Some(product) = self.product else {
            warn!(line_id = %self.id, product_id = %self.product_id, "Skipping cart line without product");
            return None;
        };
        Some(CartLine {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            product,
        })
    }
}

#[derive(Serialize)]
struct NewCartLine {
    user_id: UserId,
    product_id: ProductId,
    quantity: Quantity,
}

#[derive(Serialize)]
struct QuantityPatch {
    quantity: Quantity,
}

impl TokenResponse {
    /// Convert into a session. The backend may omit the user's email (phone
    /// sign-ups); `fallback_email` is used then.
    fn into_session(self, fallback_email: &Email) -> AuthSession {
        let now = Utc::now();
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));
        let email = self
            .user
            .email
            .and_then(|email| Email::parse(&email).ok())
            .unwrap_or_else(|| fallback_email.clone());

        AuthSession {
            user: SessionUser {
                id: self.user.id,
                email,
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

// =============================================================================
// HostedBackend
// =============================================================================

/// Client for the hosted row and auth APIs.
///
/// Cheaply cloneable; clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct HostedBackend {
    inner: Arc<HostedBackendInner>,
}

struct HostedBackendInner {
    client: reqwest::Client,
    rest_url: String,
    auth_url: String,
    anon_key: SecretString,
    cache: Option<ProductCache>,
}

impl HostedBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let base = config.url.as_str().trim_end_matches('/');
        let cache = (!config.product_cache_ttl.is_zero())
            .then(|| ProductCache::new(config.product_cache_ttl));

        Ok(Self {
            inner: Arc::new(HostedBackendInner {
                client,
                rest_url: format!("{base}/rest/v1"),
                auth_url: format!("{base}/auth/v1"),
                anon_key: config.anon_key.clone(),
                cache,
            }),
        })
    }

    /// Start a row API request against `table`.
    ///
    /// Without a user token the request runs with the anonymous key.
    fn rest(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        let anon_key = self.inner.anon_key.expose_secret();
        self.rest_with_key(method, table, anon_key, token.unwrap_or(anon_key))
    }

    fn rest_with_key(&self, method: Method, table: &str, api_key: &str, token: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}/{table}", self.inner.rest_url))
            .header("apikey", api_key)
            .bearer_auth(token)
    }

    /// Start an auth API request against `path` with the anonymous key.
    fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        self.auth_with_token(method, path, self.inner.anon_key.expose_secret())
    }

    /// Start an auth API request on behalf of the holder of `token`.
    ///
    /// `Authorization` is set exactly once; reqwest appends rather than
    /// replaces, so callers must not add another bearer on top.
    fn auth_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}/{path}", self.inner.auth_url))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::from_response(status.as_u16(), &body));
        }

        Ok(body)
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Insert catalog rows using the service key, optionally deleting every
    /// existing product first. Returns the number of rows inserted.
    ///
    /// The anonymous key cannot write to the catalog; this is operator
    /// tooling, not part of the storefront request path.
    ///
    /// # Errors
    ///
    /// Returns an error if either request fails.
    #[instrument(skip(self, service_key, products), fields(count = products.len()))]
    pub async fn seed_products(
        &self,
        service_key: &SecretString,
        products: &[NewProduct],
        clear: bool,
    ) -> Result<usize, BackendError> {
        let key = service_key.expose_secret();

        if clear {
            let request = self
                .rest_with_key(Method::DELETE, "products", key, key)
                .query(&[("id", "not.is.null")]);
            self.send(request).await?;
        }

        if products.is_empty() {
            return Ok(0);
        }

        let request = self
            .rest_with_key(Method::POST, "products", key, key)
            .header("Prefer", "return=representation")
            .json(products);
        let inserted: Vec<Product> = self.send_json(request).await?;

        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }

        Ok(inserted.len())
    }
}

#[async_trait]
impl Backend for HostedBackend {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let request = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });
        let token: TokenResponse = self.send_json(request).await?;
        Ok(token.into_session(email))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError> {
        let request = self.auth(Method::POST, "signup").json(&PasswordCredentials {
            email: email.as_str(),
            password,
        });

        match self.send_json(request).await? {
            SignUpResponse::Session(token) => Ok(SignUpOutcome::SignedIn(token.into_session(email))),
            SignUpResponse::User(user) => {
                debug!(user_id = %user.id, "Sign-up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError> {
        let request = self.auth_with_token(Method::POST, "logout", &session.access_token);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn refresh_session(&self, session: &AuthSession) -> Result<AuthSession, BackendError> {
        let request = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant {
                refresh_token: &session.refresh_token,
            });
        let token: TokenResponse = self.send_json(request).await?;

        if token.user.id != session.user.id {
            return Err(BackendError::UnexpectedResponse(
                "refreshed session belongs to a different user".to_string(),
            ));
        }

        Ok(token.into_session(&session.user.email))
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(cache) = &self.inner.cache
            && let Some(products) = cache.products().await
        {
            return Ok(products);
        }

        let request = self
            .rest(Method::GET, "products", None)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let products: Vec<Product> = self.send_json(request).await?;

        if let Some(cache) = &self.inner.cache {
            cache.insert_products(products.clone()).await;
        }

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        if let Some(cache) = &self.inner.cache
            && let Some(product) = cache.product(id).await
        {
            return Ok(Some(product));
        }

        let request = self
            .rest(Method::GET, "products", None)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let rows: Vec<Product> = self.send_json(request).await?;
        let product = rows.into_iter().next();

        if let (Some(cache), Some(product)) = (&self.inner.cache, &product) {
            cache.insert_product(product.clone()).await;
        }

        Ok(product)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn list_cart_lines(&self, session: &AuthSession) -> Result<Vec<CartLine>, BackendError> {
        let request = self
            .rest(Method::GET, "cart_items", Some(&session.access_token))
            .query(&[
                ("select", CART_LINE_SELECT.to_string()),
                ("user_id", format!("eq.{}", session.user.id)),
            ]);
        let rows: Vec<CartRow> = self.send_json(request).await?;
        Ok(rows.into_iter().filter_map(CartRow::into_line).collect())
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id, product_id = %product_id))]
    async fn insert_cart_line(
        &self,
        session: &AuthSession,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let request = self
            .rest(Method::POST, "cart_items", Some(&session.access_token))
            .header("Prefer", "return=minimal")
            .json(&NewCartLine {
                user_id: session.user.id,
                product_id,
                quantity,
            });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id, line_id = %line_id))]
    async fn update_cart_line_quantity(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let request = self
            .rest(Method::PATCH, "cart_items", Some(&session.access_token))
            .header("Prefer", "return=minimal")
            .query(&[
                ("id", format!("eq.{line_id}")),
                ("user_id", format!("eq.{}", session.user.id)),
            ])
            .json(&QuantityPatch { quantity });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id, line_id = %line_id))]
    async fn delete_cart_line(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
    ) -> Result<(), BackendError> {
        let request = self
            .rest(Method::DELETE, "cart_items", Some(&session.access_token))
            .query(&[
                ("id", format!("eq.{line_id}")),
                ("user_id", format!("eq.{}", session.user.id)),
            ]);
        self.send(request).await?;
        Ok(())
    }
}
