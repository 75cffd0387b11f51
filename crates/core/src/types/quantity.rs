//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when decoding a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero units is not a stored quantity; it means "remove the line".
    #[error("quantity must be at least 1")]
    Zero,
}

/// Number of units on a cart line.
///
/// Always at least 1. Requests for a smaller quantity never produce a
/// `Quantity`; callers treat them as removal instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Build a quantity from a requested (possibly negative) amount.
    ///
    /// Returns `None` for anything below 1 or above `u32::MAX`.
    #[must_use]
    pub fn new(requested: i64) -> Option<Self> {
        u32::try_from(requested)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
    }

    /// Number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// One more unit, saturating at `u32::MAX`.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value).map(Self).ok_or(QuantityError::Zero)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_below_one() {
        assert_eq!(Quantity::new(0), None);
        assert_eq!(Quantity::new(-1), None);
        assert_eq!(Quantity::new(i64::MIN), None);
    }

    #[test]
    fn test_new_accepts_positive() {
        assert_eq!(Quantity::new(1), Some(Quantity::ONE));
        assert_eq!(Quantity::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_new_rejects_overflow() {
        assert_eq!(Quantity::new(i64::from(u32::MAX) + 1), None);
    }

    #[test]
    fn test_incremented_saturates() {
        assert_eq!(Quantity::ONE.incremented().get(), 2);
        let max = Quantity::new(i64::from(u32::MAX)).unwrap();
        assert_eq!(max.incremented(), max);
    }

    #[test]
    fn test_deserialize_zero_fails() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().get(), 3);
    }
}
