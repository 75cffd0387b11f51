//! Cart route handlers.
//!
//! Every handler builds a [`CartStore`] for the current request and answers
//! with an HTMX fragment plus an `HX-Trigger` header carrying the
//! `cart-updated` event and/or a toast. Plain form posts are redirected.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use shophub_core::{CartLine, CartLineId, ProductId};
use tracing::instrument;

use super::products::PLACEHOLDER_IMAGE;
use super::{NavView, is_htmx};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::CurrentSession;
use crate::notifications::{HxTrigger, Notice, NoticeQuery, Toast};
use crate::services::{CartError, CartStore};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub image_url: String,
    pub unit_price: String,
    pub line_total: String,
    pub quantity: u32,
    pub quantity_up: i64,
    pub quantity_down: i64,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let quantity = line.quantity.get();
        Self {
            id: line.id.to_string(),
            product_id: line.product_id.to_string(),
            name: line.product.name.clone(),
            image_url: line
                .product
                .image_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            unit_price: line.product.price.to_string(),
            line_total: line.line_total().to_string(),
            quantity,
            quantity_up: i64::from(quantity) + 1,
            quantity_down: i64::from(quantity) - 1,
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub total: String,
    pub item_count: u64,
}

impl CartView {
    fn from_store(store: &CartStore<'_>) -> Self {
        let total = store.cart_total().to_string();
        Self {
            lines: store.lines().iter().map(CartLineView::from).collect(),
            subtotal: total.clone(),
            total,
            item_count: store.cart_count(),
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart page template (shell; lines load via HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: NavView,
    pub toast: Option<Toast>,
}

/// Cart lines and order summary fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Form data for adding to cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
}

/// Form data for setting a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: CartLineId,
    pub quantity: i64,
}

/// Form data for removing a line.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: CartLineId,
}

/// Display cart page.
pub async fn show(
    CurrentSession(session): CurrentSession,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    CartShowTemplate {
        nav: NavView::new(session.as_ref()),
        toast: query.notice.map(|notice| notice.toast()),
    }
}

/// Cart lines and order summary (HTMX fragment).
#[instrument(skip(state, session))]
pub async fn items(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Response {
    let (store, error) = CartStore::load(state.backend(), session.as_ref()).await;
    let fragment = CartItemsTemplate {
        cart: CartView::from_store(&store),
    };

    match error {
        Some(e) => (HxTrigger::toast(e.toast()), fragment).into_response(),
        None => fragment.into_response(),
    }
}

/// Add one unit of a product to the cart.
///
/// Answers HTMX with an empty 204 and the `cart-updated` event. Signed-out
/// visitors are sent to the sign-in page.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let htmx = is_htmx(&headers);
    let mut store = CartStore::new(state.backend(), session.as_ref());

    match store.add_to_cart(form.product_id).await {
        Ok(outcome) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", &product_id)]));
            if htmx {
                (
                    StatusCode::NO_CONTENT,
                    HxTrigger::cart_updated().with_toast(outcome.toast()),
                    (),
                )
                    .into_response()
            } else {
                Redirect::to("/cart").into_response()
            }
        }
        Err(CartError::SignInRequired) => {
            let location = Notice::SignInRequired.location("/auth");
            if htmx {
                (
                    StatusCode::NO_CONTENT,
                    AppendHeaders([("HX-Redirect", location)]),
                )
                    .into_response()
            } else {
                Redirect::to(&location).into_response()
            }
        }
        Err(e) => {
            if htmx {
                (StatusCode::NO_CONTENT, HxTrigger::toast(e.toast()), ()).into_response()
            } else {
                Redirect::to("/cart").into_response()
            }
        }
    }
}

/// Set a line's quantity; anything below 1 removes the line.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let (mut store, error) = CartStore::load(state.backend(), session.as_ref()).await;
    if let Some(e) = error {
        return cart_fragment(&headers, &store, HxTrigger::toast(e.toast()));
    }

    let trigger = match store.update_quantity(form.line_id, form.quantity).await {
        Ok(outcome) => {
            let line_id = form.line_id.to_string();
            add_breadcrumb("cart", "Updated quantity", Some(&[("line_id", &line_id)]));
            HxTrigger::cart_updated().with_toast(outcome.toast())
        }
        Err(e) => HxTrigger::toast(e.toast()),
    };

    cart_fragment(&headers, &store, trigger)
}

/// Remove a line from the cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let (mut store, error) = CartStore::load(state.backend(), session.as_ref()).await;
    if let Some(e) = error {
        return cart_fragment(&headers, &store, HxTrigger::toast(e.toast()));
    }

    let trigger = match store.remove_from_cart(form.line_id).await {
        Ok(outcome) => {
            let line_id = form.line_id.to_string();
            add_breadcrumb("cart", "Removed from cart", Some(&[("line_id", &line_id)]));
            HxTrigger::cart_updated().with_toast(outcome.toast())
        }
        Err(e) => HxTrigger::toast(e.toast()),
    };

    cart_fragment(&headers, &store, trigger)
}

/// Get cart count badge (HTMX fragment).
///
/// Signed out, or when the cart cannot be read, the badge is empty.
#[instrument(skip(state, session))]
pub async fn count(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> impl IntoResponse {
    let (store, _) = CartStore::load(state.backend(), session.as_ref()).await;
    CartCountTemplate {
        count: store.cart_count(),
    }
}

/// Checkout is not offered; the button only explains that.
pub async fn checkout(headers: HeaderMap) -> Response {
    let toast = Toast::info("Checkout unavailable", "Checkout is not available in this store yet");
    if is_htmx(&headers) {
        (StatusCode::NO_CONTENT, HxTrigger::toast(toast), ()).into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

fn cart_fragment(headers: &HeaderMap, store: &CartStore<'_>, trigger: HxTrigger) -> Response {
    if !is_htmx(headers) {
        return Redirect::to("/cart").into_response();
    }
    (
        trigger,
        CartItemsTemplate {
            cart: CartView::from_store(store),
        },
    )
        .into_response()
}
