//! Cart store: the signed-in user's cart lines, kept in step with the
//! backend's cart rows.
//!
//! A store is built per request from the backend handle and the current
//! session. Every mutation is a backend write followed by a full refetch;
//! nothing is updated optimistically. A failed backend call is logged,
//! reported through [`CartError`], and leaves the loaded lines untouched.
//!
//! Two concurrent adds of the same product can both see the old quantity
//! and write the same new one. The backend holds no lock to prevent this.

use shophub_core::{
    CartLine, CartLineId, Price, ProductId, Quantity, cart_count, cart_total, find_line_for_product,
};
use thiserror::Error;
use tracing::{error, instrument};

use crate::backend::{Backend, BackendError};
use crate::models::AuthSession;
use crate::notifications::Toast;

/// Errors reported by cart operations.
///
/// The display text is what the user is shown.
#[derive(Debug, Error)]
pub enum CartError {
    /// Adding requires a signed-in user.
    #[error("Create an account or sign in to add items to your cart")]
    SignInRequired,

    #[error("Failed to load cart items")]
    Fetch(#[source] BackendError),

    #[error("Failed to add item to cart")]
    Add(#[source] BackendError),

    #[error("Failed to remove item")]
    Remove(#[source] BackendError),

    #[error("Failed to update quantity")]
    Update(#[source] BackendError),
}

impl CartError {
    /// Error toast for this failure.
    #[must_use]
    pub fn toast(&self) -> Toast {
        match self {
            Self::SignInRequired => Toast::error("Please Sign In", self.to_string()),
            _ => Toast::error("Error", self.to_string()),
        }
    }

    /// The backend failure behind this error, if any.
    #[must_use]
    pub const fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::SignInRequired => None,
            Self::Fetch(e) | Self::Add(e) | Self::Remove(e) | Self::Update(e) => Some(e),
        }
    }
}

/// What a successful mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    /// A new line was inserted.
    Added,
    /// The product was already in the cart; its quantity went up by one.
    Merged,
    /// A line's quantity was set.
    Updated,
    /// A line was deleted.
    Removed,
}

impl CartOutcome {
    /// Confirmation toast, for the outcomes that show one.
    #[must_use]
    pub fn toast(self) -> Option<Toast> {
        match self {
            Self::Added => Some(Toast::info("Success", "Item added to cart")),
            Self::Removed => Some(Toast::info("Removed", "Item removed from cart")),
            Self::Merged | Self::Updated => None,
        }
    }
}

/// Loaded cart lines plus a loading flag.
#[derive(Debug, Clone)]
pub struct CartState {
    /// Lines in backend order.
    pub lines: Vec<CartLine>,
    /// True until the first fetch completes.
    pub is_loading: bool,
}

impl CartState {
    /// Nothing loaded yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            is_loading: true,
        }
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

/// The current user's cart for the duration of one request.
pub struct CartStore<'a> {
    backend: &'a dyn Backend,
    session: Option<&'a AuthSession>,
    state: CartState,
}

impl<'a> CartStore<'a> {
    /// A store for `session`'s cart; `None` means signed out.
    #[must_use]
    pub fn new(backend: &'a dyn Backend, session: Option<&'a AuthSession>) -> Self {
        Self {
            backend,
            session,
            state: CartState::new(),
        }
    }

    /// Build a store and load it.
    ///
    /// A failed load is logged and leaves the store empty, so pages can
    /// still render; the error is returned alongside for the caller to
    /// surface.
    pub async fn load(
        backend: &'a dyn Backend,
        session: Option<&'a AuthSession>,
    ) -> (Self, Option<CartError>) {
        let mut store = Self::new(backend, session);
        let error = store.fetch_cart_items().await.err();
        (store, error)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Loaded lines, in backend order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.lines
    }

    /// Whether the first fetch has not completed yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    /// Sum of price times quantity over the loaded lines.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        cart_total(&self.state.lines)
    }

    /// Sum of quantities over the loaded lines.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        cart_count(&self.state.lines)
    }

    /// Replace the loaded lines with the backend's current rows.
    ///
    /// Signed out, the cart is simply empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Fetch` if the backend call fails; the previously
    /// loaded lines are kept.
    #[instrument(skip(self))]
    pub async fn fetch_cart_items(&mut self) -> Result<(), CartError> {
        let Some(session) = self.session else {
            self.state.lines.clear();
            self.state.is_loading = false;
            return Ok(());
        };

        let result = self.backend.list_cart_lines(session).await;
        self.state.is_loading = false;

        match result {
            Ok(lines) => {
                self.state.lines = lines;
                Ok(())
            }
            Err(e) => {
                error!(user_id = %session.user.id, "Error fetching cart: {e}");
                Err(CartError::Fetch(e))
            }
        }
    }

    /// Add one unit of `product_id`.
    ///
    /// If the product already has a line, its quantity goes up by one
    /// instead of a second line being inserted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::SignInRequired` when signed out, or the error of
    /// the failing backend call.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(&mut self, product_id: ProductId) -> Result<CartOutcome, CartError> {
        let Some(session) = self.session else {
            return Err(CartError::SignInRequired);
        };

        // The merge check needs authoritative lines.
        if self.state.is_loading {
            self.fetch_cart_items().await?;
        }

        let existing =
            find_line_for_product(&self.state.lines, product_id).map(|line| (line.id, line.quantity));
        if let Some((line_id, quantity)) = existing {
            self.update_quantity(line_id, i64::from(quantity.incremented().get()))
                .await?;
            return Ok(CartOutcome::Merged);
        }

        if let Err(e) = self
            .backend
            .insert_cart_line(session, product_id, Quantity::ONE)
            .await
        {
            error!(user_id = %session.user.id, "Error adding to cart: {e}");
            return Err(CartError::Add(e));
        }

        self.fetch_cart_items().await?;
        Ok(CartOutcome::Added)
    }

    /// Delete a line. Deleting a line that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remove` if the delete fails, or
    /// `CartError::Fetch` if the refetch does.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_from_cart(&mut self, line_id: CartLineId) -> Result<CartOutcome, CartError> {
        let Some(session) = self.session else {
            return Err(CartError::SignInRequired);
        };

        if let Err(e) = self.backend.delete_cart_line(session, line_id).await {
            error!(user_id = %session.user.id, "Error removing from cart: {e}");
            return Err(CartError::Remove(e));
        }

        self.fetch_cart_items().await?;
        Ok(CartOutcome::Removed)
    }

    /// Set a line's quantity. Anything below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Update` (or `CartError::Remove` for removals) if
    /// the write fails, or `CartError::Fetch` if the refetch does.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &mut self,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<CartOutcome, CartError> {
        let Some(quantity) = Quantity::new(quantity) else {
            return self.remove_from_cart(line_id).await;
        };
        let Some(session) = self.session else {
            return Err(CartError::SignInRequired);
        };

        if let Err(e) = self
            .backend
            .update_cart_line_quantity(session, line_id, quantity)
            .await
        {
            error!(user_id = %session.user.id, "Error updating quantity: {e}");
            return Err(CartError::Update(e));
        }

        self.fetch_cart_items().await?;
        Ok(CartOutcome::Updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shophub_core::{Email, Product};

    use super::*;
    use crate::backend::memory::MemoryBackend;

    struct Fixture {
        backend: MemoryBackend,
        session: AuthSession,
        shoes: Product,
        bottle: Product,
    }

    async fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let shoes = backend
            .add_product("Classic Leather Sneakers", Decimal::new(10, 0), 4)
            .await;
        let bottle = backend
            .add_product("Stainless Steel Water Bottle", Decimal::new(5, 0), 9)
            .await;
        let email = Email::parse("shopper@example.com").unwrap();
        backend.register_user(&email, "secret1").await;
        let session = backend.sign_in_with_password(&email, "secret1").await.unwrap();
        Fixture {
            backend,
            session,
            shoes,
            bottle,
        }
    }

    #[tokio::test]
    async fn test_new_store_is_loading() {
        let fx = fixture().await;
        let store = CartStore::new(&fx.backend, Some(&fx.session));
        assert!(store.is_loading());
        assert!(store.lines().is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_fetch_is_empty() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, None);
        store.fetch_cart_items().await.unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.cart_count(), 0);
        assert_eq!(store.cart_total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_signed_out_add_creates_nothing() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, None);

        let err = store.add_to_cart(fx.shoes.id).await.unwrap_err();
        assert!(matches!(err, CartError::SignInRequired));
        assert!(fx.backend.cart_rows_for(fx.session.user.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_adding_twice_merges_into_one_line() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, Some(&fx.session));

        assert_eq!(store.add_to_cart(fx.shoes.id).await.unwrap(), CartOutcome::Added);
        assert_eq!(store.add_to_cart(fx.shoes.id).await.unwrap(), CartOutcome::Merged);

        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.lines()[0].quantity.get(), 2);
        assert_eq!(
            fx.backend.cart_rows_for(fx.session.user.id).await,
            vec![(fx.shoes.id, 2)]
        );
    }

    #[tokio::test]
    async fn test_merge_sees_rows_from_earlier_requests() {
        let fx = fixture().await;
        CartStore::new(&fx.backend, Some(&fx.session))
            .add_to_cart(fx.shoes.id)
            .await
            .unwrap();

        // A fresh store has not fetched yet; adding must still merge.
        let mut store = CartStore::new(&fx.backend, Some(&fx.session));
        assert_eq!(store.add_to_cart(fx.shoes.id).await.unwrap(), CartOutcome::Merged);
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.cart_count(), 2);
    }

    #[tokio::test]
    async fn test_totals_follow_every_mutation() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, Some(&fx.session));

        store.add_to_cart(fx.shoes.id).await.unwrap();
        store.add_to_cart(fx.shoes.id).await.unwrap();
        store.add_to_cart(fx.bottle.id).await.unwrap();
        assert_eq!(store.cart_total().to_string(), "$25.00");
        assert_eq!(store.cart_count(), 3);

        let shoes_line = store.lines().iter().find(|l| l.product_id == fx.shoes.id).unwrap().id;
        store.update_quantity(shoes_line, 5).await.unwrap();
        assert_eq!(store.cart_total().to_string(), "$55.00");
        assert_eq!(store.cart_count(), 6);
    }

    #[tokio::test]
    async fn test_update_below_one_removes() {
        for quantity in [0, -1] {
            let fx = fixture().await;
            let mut store = CartStore::new(&fx.backend, Some(&fx.session));
            store.add_to_cart(fx.shoes.id).await.unwrap();
            let line_id = store.lines()[0].id;

            let outcome = store.update_quantity(line_id, quantity).await.unwrap();
            assert_eq!(outcome, CartOutcome::Removed);
            assert!(store.lines().is_empty());
        }
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_ok() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, Some(&fx.session));
        store.add_to_cart(fx.bottle.id).await.unwrap();

        let outcome = store.remove_from_cart(CartLineId::generate()).await.unwrap();
        assert_eq!(outcome, CartOutcome::Removed);
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_state_unchanged() {
        let fx = fixture().await;
        let mut store = CartStore::new(&fx.backend, Some(&fx.session));
        store.add_to_cart(fx.shoes.id).await.unwrap();
        let before = store.lines().to_vec();

        fx.backend.set_unavailable(true).await;
        let err = store.add_to_cart(fx.bottle.id).await.unwrap_err();
        assert!(matches!(err, CartError::Add(_)));
        assert_eq!(err.to_string(), "Failed to add item to cart");
        assert_eq!(store.lines(), before.as_slice());

        let err = store.update_quantity(before[0].id, 3).await.unwrap_err();
        assert!(matches!(err, CartError::Update(_)));
        let err = store.remove_from_cart(before[0].id).await.unwrap_err();
        assert!(matches!(err, CartError::Remove(_)));
        let err = store.fetch_cart_items().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load cart items");
        assert_eq!(store.lines(), before.as_slice());
    }

    #[tokio::test]
    async fn test_load_reports_fetch_error() {
        let fx = fixture().await;
        fx.backend.set_unavailable(true).await;

        let (store, error) = CartStore::load(&fx.backend, Some(&fx.session)).await;
        assert!(!store.is_loading());
        assert!(store.lines().is_empty());
        assert!(matches!(error, Some(CartError::Fetch(_))));
    }

    #[test]
    fn test_outcome_toasts() {
        assert_eq!(
            CartOutcome::Added.toast().unwrap().description,
            "Item added to cart"
        );
        assert_eq!(CartOutcome::Removed.toast().unwrap().title, "Removed");
        assert!(CartOutcome::Merged.toast().is_none());
        assert!(CartOutcome::Updated.toast().is_none());
    }
}
