//! Derived cart values.
//!
//! Totals are computed from the current lines every time they are read.
//! Nothing here is cached, so they cannot drift from the lines they describe.

use crate::types::{CartLine, Price, ProductId};

/// Sum of unit price times quantity over all lines.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Price {
    lines.iter().map(CartLine::line_total).sum()
}

/// Sum of quantities over all lines.
#[must_use]
pub fn cart_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity.get())).sum()
}

/// The line holding `product_id`, if any.
///
/// Add-to-cart merges into this line instead of inserting a second one.
#[must_use]
pub fn find_line_for_product(lines: &[CartLine], product_id: ProductId) -> Option<&CartLine> {
    lines.iter().find(|line| line.product_id == product_id)
}
