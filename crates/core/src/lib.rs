//! ShopHub Core - Shared domain types.
//!
//! This crate provides the types used across the ShopHub components:
//! - `storefront` - Server-rendered storefront backed by the hosted data/auth service
//! - `cli` - Operator tools for session migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Cart arithmetic and form validation live here so they can be
//! tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, and the
//!   product / cart line records
//! - [`cart`] - Derived cart values (total, count) and merge lookup
//! - [`validation`] - Pre-submission checks for the auth forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;
pub mod validation;

pub use cart::{cart_count, cart_total, find_line_for_product};
pub use types::*;
pub use validation::{
    MIN_PASSWORD_LENGTH, ValidationError, validate_email, validate_password,
    validate_password_confirmation,
};
