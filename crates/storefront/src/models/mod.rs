//! Storefront-side models that are not part of the shared domain crate.

pub mod session;

pub use session::{AuthSession, SessionUser};
