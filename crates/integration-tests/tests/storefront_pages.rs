//! Listing, grid fragment and product detail pages.

use axum::http::StatusCode;
use shophub_integration_tests::TestApp;

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_home_renders_skeletons_until_grid_loads() {
    let app = TestApp::new();

    let resp = app.get("/").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Discover Amazing Products"));
    assert!(resp.body.contains("Featured Products"));
    assert_eq!(resp.body.matches("card-skeleton").count(), 6);
    assert!(resp.body.contains(r#"hx-get="/products/grid""#));
}

/// `hx-get` targets of elements that load on page load.
fn load_fragments(body: &str) -> Vec<String> {
    body.split("<")
        .filter(|tag| tag.contains(r#"hx-trigger="load"#))
        .filter_map(|tag| tag.split(r#"hx-get=""#).nth(1))
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_shell_fragments_are_served() {
    let app = TestApp::new();
    app.sign_in_new_user("shopper@example.com").await;
    app.product("Cotton T-Shirt", "24.99", 10).await;

    for page in ["/", "/cart"] {
        let resp = app.get(page).await;
        // Fragment loader, fingerprinted or not
        assert!(resp.body.contains("/static/js/derived/app.") || resp.body.contains("/static/js/app.js"));

        let fragments = load_fragments(&resp.body);
        assert!(!fragments.is_empty(), "{page} has no load fragments");
        for fragment in fragments {
            let resp = app.htmx_get(&fragment).await;
            assert_eq!(resp.status, StatusCode::OK, "{fragment} from {page}");
            assert!(!resp.body.contains("skeleton"), "{fragment} from {page}");
        }
    }
}

#[tokio::test]
async fn test_grid_lists_newest_first() {
    let app = TestApp::new();
    app.product("Cotton T-Shirt", "24.99", 10).await;
    app.product("Laptop Backpack", "69.99", 3).await;

    let resp = app.htmx_get("/products/grid").await;

    assert_eq!(resp.status, StatusCode::OK);
    let backpack = resp.body.find("Laptop Backpack").unwrap();
    let shirt = resp.body.find("Cotton T-Shirt").unwrap();
    assert!(backpack < shirt, "newest product should come first");
    assert!(resp.body.contains("$24.99"));
    assert_eq!(resp.body.matches("Add to Cart").count(), 2);
}

#[tokio::test]
async fn test_grid_empty_catalog() {
    let app = TestApp::new();

    let resp = app.htmx_get("/products/grid").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("No products yet"));
    assert!(resp.hx_trigger().is_none());
}

#[tokio::test]
async fn test_grid_backend_failure_shows_toast() {
    let app = TestApp::new();
    app.product("Cotton T-Shirt", "24.99", 10).await;
    app.backend.set_unavailable(true).await;

    let resp = app.htmx_get("/products/grid").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.body.contains("Cotton T-Shirt"));
    assert!(!resp.body.contains("No products yet"));
    let trigger = resp.hx_trigger().unwrap();
    assert_eq!(trigger["toast"]["description"], "Failed to load products");
    assert_eq!(trigger["toast"]["variant"], "destructive");
}

#[tokio::test]
async fn test_notice_query_renders_toast() {
    let app = TestApp::new();

    let resp = app.get("/?notice=signed_out").await;
    assert!(resp.body.contains("You&#39;ve been signed out") || resp.body.contains("You've been signed out"));

    // Unknown notices are ignored
    let resp = app.get("/?notice=bogus").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.body.contains("toast-title"));
}

// ============================================================================
// Detail
// ============================================================================

#[tokio::test]
async fn test_product_detail() {
    let app = TestApp::new();
    let product = app.product("Wireless Headphones", "149.99", 15).await;

    let resp = app.get(&format!("/product/{}", product.id)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Wireless Headphones"));
    assert!(resp.body.contains("$149.99"));
    assert!(resp.body.contains("15 in stock"));
    assert!(resp.body.contains("Back to Shop"));
    assert!(!resp.body.contains("disabled"));
}

#[tokio::test]
async fn test_product_detail_out_of_stock() {
    let app = TestApp::new();
    let product = app.product("Yoga Mat", "39.99", 0).await;

    let resp = app.get(&format!("/product/{}", product.id)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Out of stock"));
    assert!(resp.body.contains("Out of Stock"));
    assert!(resp.body.contains("disabled"));
}

#[tokio::test]
async fn test_product_not_found() {
    let app = TestApp::new();

    let resp = app
        .get("/product/3f1c2b4a-0000-4000-8000-000000000000")
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.contains("Product not found"));

    let resp = app.get("/product/not-a-uuid").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.contains("Product not found"));
}

#[tokio::test]
async fn test_product_backend_failure_is_bad_gateway() {
    let app = TestApp::new();
    let product = app.product("Wireless Headphones", "149.99", 15).await;
    app.backend.set_unavailable(true).await;

    let resp = app.get(&format!("/product/{}", product.id)).await;

    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let resp = app.get("/no/such/page").await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
