//! Smoke tests against a running storefront.
//!
//! These tests require:
//! - The storefront running (cargo run -p shophub-storefront)
//! - Its session table created (shophub-cli migrate sessions)
//!
//! Run with: cargo test -p shophub-integration-tests -- --ignored

use reqwest::{Client, StatusCode};

/// Base URL for the storefront (configurable via environment).
fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_security_headers() {
    let resp = client()
        .get(storefront_base_url())
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_anonymous_add_to_cart_redirects_to_sign_in() {
    let resp = client()
        .post(format!("{}/cart/add", storefront_base_url()))
        .header("HX-Request", "true")
        .form(&[("product_id", "3f1c2b4a-0000-4000-8000-000000000000")])
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(
        resp.headers()["HX-Redirect"],
        "/auth?notice=sign_in_required"
    );
}
