//! Product detail route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shophub_core::{Product, ProductId};
use tracing::{debug, instrument};

use super::NavView;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CurrentSession;
use crate::notifications::{NoticeQuery, Toast};
use crate::state::AppState;

/// Placeholder shown for products without an image.
pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.svg";

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub category: String,
    pub stock_label: String,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            image_url: product
                .image_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            category: product.category.clone(),
            stock_label: product.stock_label(),
            in_stock: product.in_stock(),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: NavView,
    pub toast: Option<Toast>,
    pub product: ProductView,
}

/// "Product not found" page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub nav: NavView,
    pub toast: Option<Toast>,
}

/// Display product detail page.
///
/// Ids that are malformed or match no product get the not-found page.
#[instrument(skip(state, session, query))]
pub async fn show(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Query(query): Query<NoticeQuery>,
) -> Result<Response> {
    let nav = NavView::new(session.as_ref());
    let toast = query.notice.map(|notice| notice.toast());

    let product = match id.parse::<ProductId>() {
        Ok(product_id) => state.backend().get_product(product_id).await?,
        Err(_) => {
            debug!("Malformed product id");
            None
        }
    };

    let Some(product) = product else {
        return Ok((
            StatusCode::NOT_FOUND,
            ProductNotFoundTemplate { nav, toast },
        )
            .into_response());
    };

    add_breadcrumb("navigation", "Viewed product", Some(&[("product_id", &id)]));

    Ok(ProductShowTemplate {
        nav,
        toast,
        product: ProductView::from(&product),
    }
    .into_response())
}
