//! Cart line items and session-level aggregation.
//!
//! Aggregation is recompute-on-read: cart edits are rare relative to reads,
//! so totals are derived from the participant list instead of being stored.
//! All money is integer cents.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::participant::Participant;

/// Validation errors for cart line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartValidationError {
    EmptyItemName,
    ZeroQuantity,
    NegativeUnitPrice,
}

impl fmt::Display for CartValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyItemName => write!(f, "cart item name must not be empty"),
            Self::ZeroQuantity => write!(f, "cart item quantity must be at least 1"),
            Self::NegativeUnitPrice => write!(f, "cart item unit price must not be negative"),
        }
    }
}

impl std::error::Error for CartValidationError {}

/// One ordered line: a menu reference, quantity, and chosen options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    menu_item_id: Uuid,
    name: String,
    quantity: u32,
    unit_price_cents: i64,
    options: Vec<String>,
}

impl CartItem {
    /// Validate and construct a cart line.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::CartItem;
    /// use uuid::Uuid;
    ///
    /// let item = CartItem::new(Uuid::new_v4(), "Pad Thai", 2, 1250, vec!["extra lime".into()])
    ///     .expect("valid line");
    /// assert_eq!(item.line_total_cents(), 2500);
    /// ```
    pub fn new(
        menu_item_id: Uuid,
        name: impl Into<String>,
        quantity: u32,
        unit_price_cents: i64,
        options: Vec<String>,
    ) -> Result<Self, CartValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CartValidationError::EmptyItemName);
        }
        if quantity == 0 {
            return Err(CartValidationError::ZeroQuantity);
        }
        if unit_price_cents < 0 {
            return Err(CartValidationError::NegativeUnitPrice);
        }
        Ok(Self {
            menu_item_id,
            name,
            quantity,
            unit_price_cents,
            options,
        })
    }

    /// Referenced menu item.
    pub fn menu_item_id(&self) -> Uuid {
        self.menu_item_id
    }

    /// Menu item name captured at ordering time.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Ordered quantity, always at least 1.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price in cents.
    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    /// Chosen options in submission order.
    pub fn options(&self) -> &[String] {
        self.options.as_slice()
    }

    /// Line total in cents, saturating rather than wrapping on overflow.
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents
            .saturating_mul(i64::from(self.quantity))
    }
}

/// Subtotal for one participant's cart in cents.
pub fn subtotal_cents(items: &[CartItem]) -> i64 {
    items
        .iter()
        .fold(0_i64, |sum, item| sum.saturating_add(item.line_total_cents()))
}

/// Session total: the sum of every participant's subtotal.
pub fn session_total_cents(participants: &[Participant]) -> i64 {
    participants
        .iter()
        .fold(0_i64, |sum, p| sum.saturating_add(p.subtotal_cents()))
}

/// Total number of line items across one participant's cart.
pub fn item_count(items: &[CartItem]) -> usize {
    items.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(quantity: u32, unit_price_cents: i64) -> CartItem {
        CartItem::new(Uuid::new_v4(), "Green Curry", quantity, unit_price_cents, vec![])
            .expect("valid line")
    }

    #[rstest]
    #[case(1, 950, 950)]
    #[case(3, 950, 2850)]
    #[case(2, 0, 0)]
    fn line_totals_multiply_quantity(
        #[case] quantity: u32,
        #[case] unit_price_cents: i64,
        #[case] expected: i64,
    ) {
        assert_eq!(line(quantity, unit_price_cents).line_total_cents(), expected);
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let items = vec![line(2, 1250), line(1, 400)];
        assert_eq!(subtotal_cents(&items), 2900);
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(subtotal_cents(&[]), 0);
    }

    #[rstest]
    #[case("", 1, 100, CartValidationError::EmptyItemName)]
    #[case("Satay", 0, 100, CartValidationError::ZeroQuantity)]
    #[case("Satay", 1, -5, CartValidationError::NegativeUnitPrice)]
    fn rejects_malformed_lines(
        #[case] name: &str,
        #[case] quantity: u32,
        #[case] unit_price_cents: i64,
        #[case] expected: CartValidationError,
    ) {
        let error = CartItem::new(Uuid::new_v4(), name, quantity, unit_price_cents, vec![])
            .expect_err("line should be rejected");
        assert_eq!(error, expected);
    }

    #[test]
    fn line_total_saturates_on_overflow() {
        let item = line(u32::MAX, i64::MAX);
        assert_eq!(item.line_total_cents(), i64::MAX);
    }
}
