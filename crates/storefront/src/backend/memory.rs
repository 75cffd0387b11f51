//! In-memory backend for tests and local demos.
//!
//! Mimics the hosted backend closely enough for the storefront's purposes:
//! the same error codes and messages for auth failures, rows scoped by the
//! token's user, and products listed newest first.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use shophub_core::{
    CartLine, CartLineId, CartProduct, Email, MIN_PASSWORD_LENGTH, Price, Product, ProductId,
    Quantity, UserId,
};

use super::{Backend, BackendError, SignUpOutcome};
use crate::models::{AuthSession, SessionUser};

struct MemoryUser {
    id: UserId,
    email: Email,
    password: String,
    confirmed: bool,
}

struct CartRow {
    id: CartLineId,
    user_id: UserId,
    product_id: ProductId,
    quantity: Quantity,
}

struct IssuedToken {
    user_id: UserId,
    expires_at: chrono::DateTime<Utc>,
}

struct MemoryState {
    users: Vec<MemoryUser>,
    access_tokens: HashMap<String, IssuedToken>,
    refresh_tokens: HashMap<String, UserId>,
    products: Vec<Product>,
    cart: Vec<CartRow>,
    unavailable: bool,
    confirm_email: bool,
    token_lifetime: Duration,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            products: Vec::new(),
            cart: Vec::new(),
            unavailable: false,
            confirm_email: false,
            token_lifetime: Duration::hours(1),
        }
    }
}

impl MemoryState {
    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable {
            return Err(api_error(503, None, "Service Unavailable"));
        }
        Ok(())
    }

    fn issue_session(&mut self, user_id: UserId, email: Email) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.token_lifetime;

        self.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id,
                expires_at,
            },
        );
        self.refresh_tokens.insert(refresh_token.clone(), user_id);

        AuthSession {
            user: SessionUser { id: user_id, email },
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// The user an access token belongs to.
    fn authorize(&self, session: &AuthSession) -> Result<UserId, BackendError> {
        match self.access_tokens.get(&session.access_token) {
            Some(token) if token.expires_at > Utc::now() => Ok(token.user_id),
            Some(_) => Err(api_error(401, Some("PGRST301"), "JWT expired")),
            None => Err(api_error(401, Some("PGRST301"), "JWT could not be decoded")),
        }
    }

    fn cart_product(&self, product_id: ProductId) -> Option<CartProduct> {
        self.products
            .iter()
            .find(|product| product.id == product_id)
            .map(CartProduct::from)
    }
}

fn api_error(status: u16, code: Option<&str>, message: &str) -> BackendError {
    BackendError::Api {
        status,
        code: code.map(str::to_string),
        message: message.to_string(),
    }
}

/// A [`Backend`] holding everything in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// An empty backend: no users, no products.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product to the catalog. Later products list first.
    ///
    /// # Panics
    ///
    /// Panics if `price` is negative.
    #[allow(clippy::expect_used)]
    pub async fn add_product(&self, name: &str, price: Decimal, stock: u32) -> Product {
        let mut state = self.state.lock().await;
        // Strictly increasing timestamps keep the listing order deterministic.
        let created_at = state
            .products
            .iter()
            .map(|product| product.created_at)
            .max()
            .map_or_else(Utc::now, |latest| latest + Duration::seconds(1));

        let product = Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Price::new(price).expect("product price must not be negative"),
            image_url: None,
            category: "General".to_string(),
            stock,
            created_at,
        };
        state.products.push(product.clone());
        product
    }

    /// Drop a product from the catalog, leaving any cart rows that point at it.
    pub async fn delete_product(&self, product_id: ProductId) {
        self.state
            .lock()
            .await
            .products
            .retain(|product| product.id != product_id);
    }

    /// Register a confirmed user directly.
    pub async fn register_user(&self, email: &Email, password: &str) -> UserId {
        let mut state = self.state.lock().await;
        let id = UserId::generate();
        state.users.push(MemoryUser {
            id,
            email: email.clone(),
            password: password.to_string(),
            confirmed: true,
        });
        id
    }

    /// Make every call fail with a 503 until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Whether new sign-ups must confirm their email before signing in.
    pub async fn require_email_confirmation(&self, required: bool) {
        self.state.lock().await.confirm_email = required;
    }

    /// Lifetime of access tokens issued from now on.
    pub async fn set_token_lifetime(&self, lifetime: Duration) {
        self.state.lock().await.token_lifetime = lifetime;
    }

    /// Invalidate every refresh token issued so far.
    pub async fn revoke_refresh_tokens(&self) {
        self.state.lock().await.refresh_tokens.clear();
    }

    /// `(product, quantity)` for each of a user's cart rows, in row order.
    pub async fn cart_rows_for(&self, user_id: UserId) -> Vec<(ProductId, u32)> {
        self.state
            .lock()
            .await
            .cart
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| (row.product_id, row.quantity.get()))
            .collect()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        let Some(user) = state
            .users
            .iter()
            .find(|user| user.email.as_str().eq_ignore_ascii_case(email.as_str()))
        else {
            return Err(api_error(400, Some("invalid_credentials"), "Invalid login credentials"));
        };
        if user.password != password {
            return Err(api_error(400, Some("invalid_credentials"), "Invalid login credentials"));
        }
        if !user.confirmed {
            return Err(api_error(400, Some("email_not_confirmed"), "Email not confirmed"));
        }

        let (id, email) = (user.id, user.email.clone());
        Ok(state.issue_session(id, email))
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(api_error(
                422,
                Some("weak_password"),
                "Password should be at least 6 characters.",
            ));
        }
        if state
            .users
            .iter()
            .any(|user| user.email.as_str().eq_ignore_ascii_case(email.as_str()))
        {
            return Err(api_error(422, Some("user_already_exists"), "User already registered"));
        }

        let id = UserId::generate();
        let confirmed = !state.confirm_email;
        state.users.push(MemoryUser {
            id,
            email: email.clone(),
            password: password.to_string(),
            confirmed,
        });

        if confirmed {
            Ok(SignUpOutcome::SignedIn(state.issue_session(id, email.clone())))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.access_tokens.remove(&session.access_token);
        state.refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }

    async fn refresh_session(&self, session: &AuthSession) -> Result<AuthSession, BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        let Some(user_id) = state.refresh_tokens.remove(&session.refresh_token) else {
            return Err(api_error(
                400,
                Some("refresh_token_not_found"),
                "Invalid Refresh Token: Refresh Token Not Found",
            ));
        };
        state.access_tokens.remove(&session.access_token);
        Ok(state.issue_session(user_id, session.user.email.clone()))
    }

    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;

        let mut products = state.products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.products.iter().find(|product| product.id == id).cloned())
    }

    async fn list_cart_lines(&self, session: &AuthSession) -> Result<Vec<CartLine>, BackendError> {
        let state = self.state.lock().await;
        state.check_available()?;
        let user_id = state.authorize(session)?;

        Ok(state
            .cart
            .iter()
            .filter(|row| row.user_id == user_id && row.user_id == session.user.id)
            // A row whose product is gone has a null embed; it is skipped
            // the same way the hosted backend skips it.
            .filter_map(|row| {
                state.cart_product(row.product_id).map(|product| CartLine {
                    id: row.id,
                    user_id: row.user_id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    product,
                })
            })
            .collect())
    }

    async fn insert_cart_line(
        &self,
        session: &AuthSession,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let user_id = state.authorize(session)?;

        if state.cart_product(product_id).is_none() {
            return Err(api_error(
                409,
                Some("23503"),
                "insert or update on table \"cart_items\" violates foreign key constraint",
            ));
        }

        state.cart.push(CartRow {
            id: CartLineId::generate(),
            user_id,
            product_id,
            quantity,
        });
        Ok(())
    }

    async fn update_cart_line_quantity(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let user_id = state.authorize(session)?;

        if let Some(row) = state
            .cart
            .iter_mut()
            .find(|row| row.id == line_id && row.user_id == user_id)
        {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_line(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let user_id = state.authorize(session)?;

        state
            .cart
            .retain(|row| !(row.id == line_id && row.user_id == user_id));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_errors_match_hosted_backend() {
        let backend = MemoryBackend::new();
        backend.register_user(&email("a@b.com"), "secret1").await;

        let err = backend
            .sign_in_with_password(&email("a@b.com"), "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(err.message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_unconfirmed_sign_up() {
        let backend = MemoryBackend::new();
        backend.require_email_confirmation(true).await;

        let outcome = backend.sign_up(&email("a@b.com"), "secret1").await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired));

        let err = backend
            .sign_in_with_password(&email("a@b.com"), "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("email_not_confirmed"));
    }

    #[tokio::test]
    async fn test_products_newest_first() {
        let backend = MemoryBackend::new();
        backend.add_product("Older", Decimal::ONE, 1).await;
        backend.add_product("Newer", Decimal::ONE, 1).await;

        let names: Vec<String> = backend
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|product| product.name)
            .collect();
        assert_eq!(names, ["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_cart_rows_scoped_to_token_user() {
        let backend = MemoryBackend::new();
        let product = backend.add_product("Yoga Mat", Decimal::new(3450, 2), 3).await;
        backend.register_user(&email("a@b.com"), "secret1").await;
        backend.register_user(&email("c@d.com"), "secret2").await;

        let alice = backend
            .sign_in_with_password(&email("a@b.com"), "secret1")
            .await
            .unwrap();
        let bob = backend
            .sign_in_with_password(&email("c@d.com"), "secret2")
            .await
            .unwrap();

        backend
            .insert_cart_line(&alice, product.id, Quantity::ONE)
            .await
            .unwrap();
        let alice_lines = backend.list_cart_lines(&alice).await.unwrap();
        assert_eq!(alice_lines.len(), 1);
        assert!(backend.list_cart_lines(&bob).await.unwrap().is_empty());

        // Bob cannot delete Alice's line.
        backend
            .delete_cart_line(&bob, alice_lines[0].id)
            .await
            .unwrap();
        assert_eq!(backend.cart_rows_for(alice.user.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cart_line_of_deleted_product_is_skipped() {
        let backend = MemoryBackend::new();
        let kept = backend.add_product("Yoga Mat", Decimal::new(3450, 2), 3).await;
        let gone = backend.add_product("Laptop Backpack", Decimal::new(5900, 2), 3).await;
        backend.register_user(&email("a@b.com"), "secret1").await;
        let session = backend
            .sign_in_with_password(&email("a@b.com"), "secret1")
            .await
            .unwrap();

        backend.insert_cart_line(&session, kept.id, Quantity::ONE).await.unwrap();
        backend.insert_cart_line(&session, gone.id, Quantity::ONE).await.unwrap();
        backend.delete_product(gone.id).await;

        let lines = backend.list_cart_lines(&session).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, kept.id);
        assert_eq!(backend.cart_rows_for(session.user.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_rejected_and_refreshable() {
        let backend = MemoryBackend::new();
        backend.register_user(&email("a@b.com"), "secret1").await;
        backend.set_token_lifetime(Duration::seconds(-1)).await;

        let session = backend
            .sign_in_with_password(&email("a@b.com"), "secret1")
            .await
            .unwrap();
        let err = backend.list_cart_lines(&session).await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        backend.set_token_lifetime(Duration::hours(1)).await;
        let refreshed = backend.refresh_session(&session).await.unwrap();
        assert!(backend.list_cart_lines(&refreshed).await.unwrap().is_empty());
        assert!(backend.refresh_session(&session).await.is_err());
    }
}
