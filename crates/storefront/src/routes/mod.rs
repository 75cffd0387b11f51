//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Product listing shell (skeletons)
//! GET  /products/grid          - Product grid fragment (HTMX, loaded on mount)
//! GET  /product/{id}           - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page shell (skeletons)
//! GET  /cart/items             - Cart lines + order summary fragment
//! POST /cart/add               - Add to cart (empty body, triggers cart-updated)
//! POST /cart/update            - Set quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /checkout               - Not available; answers with a notification
//!
//! # Auth
//! GET  /auth                   - Sign-in / sign-up page
//! POST /auth/sign-in           - Sign-in action
//! POST /auth/sign-up           - Sign-up action
//! POST /auth/sign-out          - Sign-out action
//! ```

pub mod auth;
pub mod cart;
pub mod home;
pub mod products;

use axum::{
    Router,
    http::{HeaderMap, Uri},
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::models::AuthSession;
use crate::state::AppState;

/// Navbar data shared by every full page.
#[derive(Clone, Default)]
pub struct NavView {
    /// Email of the signed-in user; `None` when signed out.
    pub user_email: Option<String>,
}

impl NavView {
    #[must_use]
    pub fn new(session: Option<&AuthSession>) -> Self {
        Self {
            user_email: session.map(|s| s.user.email.to_string()),
        }
    }
}

/// Whether the request was issued by HTMX (as opposed to a plain form post).
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|value| value.as_bytes() == b"true")
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/products/grid", get(home::grid))
        .route("/product/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", get(cart::items))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::page))
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-out", post(auth::sign_out))
}

fn storefront_routes() -> Router<AppState> {
    Router::new()
        .merge(product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .fallback(not_found)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    storefront_routes().nest("/auth", auth_routes())
}

/// Create all routes, with the auth routes rate limited per client IP.
///
/// The rate limiter needs a client address; serve with
/// `into_make_service_with_connect_info::<SocketAddr>()` when no proxy sets
/// forwarding headers.
pub fn rate_limited_routes() -> Router<AppState> {
    storefront_routes().nest("/auth", auth_routes().route_layer(auth_rate_limiter()))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }

    #[test]
    fn test_nav_view_signed_out() {
        assert!(NavView::new(None).user_email.is_none());
    }

    #[test]
    fn test_app_js_loads_fragments_without_htmx() {
        let script = include_str!("../../static/js/app.js");
        assert!(script.contains("if (!window.htmx)"));
        assert!(script.contains("[hx-get][hx-trigger^='load']"));
        assert!(script.contains(r#""HX-Request": "true""#));
    }
}
