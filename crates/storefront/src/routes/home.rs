//! Product listing: page shell and the grid fragment it loads.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use tracing::{error, instrument};

use super::NavView;
use super::products::ProductView;
use crate::filters;
use crate::middleware::CurrentSession;
use crate::notifications::{HxTrigger, NoticeQuery, Toast};
use crate::state::AppState;

/// Number of placeholder cards shown while the grid loads.
pub const SKELETON_CARDS: usize = 6;

/// Listing page template.
///
/// Renders skeleton cards; the grid replaces them once `/products/grid`
/// answers.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct HomeTemplate {
    pub nav: NavView,
    pub toast: Option<Toast>,
    pub skeletons: usize,
}

/// Product grid fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub products: Vec<ProductView>,
    pub failed: bool,
}

/// Display the listing page.
pub async fn home(
    CurrentSession(session): CurrentSession,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    HomeTemplate {
        nav: NavView::new(session.as_ref()),
        toast: query.notice.map(|notice| notice.toast()),
        skeletons: SKELETON_CARDS,
    }
}

/// Product grid fragment, newest first.
///
/// A failed fetch renders an empty grid and a notification.
#[instrument(skip(state))]
pub async fn grid(State(state): State<AppState>) -> Response {
    match state.backend().list_products().await {
        Ok(products) => ProductGridTemplate {
            products: products.iter().map(ProductView::from).collect(),
            failed: false,
        }
        .into_response(),
        Err(e) => {
            error!("Error fetching products: {e}");
            (
                HxTrigger::toast(Toast::error("Error", "Failed to load products")),
                ProductGridTemplate {
                    products: Vec::new(),
                    failed: true,
                },
            )
                .into_response()
        }
    }
}
