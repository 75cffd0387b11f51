//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in, sign-up and sign-out against the hosted auth API
//! - `cart` - Per-request cart store synchronized with backend cart rows

pub mod auth;
pub mod cart;

pub use auth::{AuthError, AuthGateway};
pub use cart::{CartError, CartOutcome, CartState, CartStore};
