//! Cart pricing.
//!
//! Pure functions only: the authoritative totals for an order are computed
//! here from a cart snapshot and an optional coupon, and handlers reject any
//! client-submitted totals that disagree with this recomputation.

use serde::{Deserialize, Serialize};

/// Carts whose discounted subtotal reaches this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 1000;

/// Flat shipping fee charged below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: i64 = 100;

/// One cart line as priced at order time. Amounts are whole currency units.
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub unit_price: i64,
    pub quantity: i64,
}

/// The computed price breakdown for a cart snapshot.
///
/// `discount` carries the coupon's face value even when it exceeds the
/// subtotal (order records keep it for audit); the payable amount is clamped
/// at zero before the shipping fee is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

/// Computes subtotal, discount, shipping fee, and total for a cart.
///
/// An empty cart prices to all zeros regardless of coupon. Inputs are assumed
/// validated (non-negative unit prices, positive quantities); this function
/// never fails for well-formed input.
pub fn price_cart(lines: &[CartLine], coupon_amount: Option<i64>) -> Pricing {
    if lines.is_empty() {
        return Pricing {
            subtotal: 0,
            discount: 0,
            shipping_fee: 0,
            total: 0,
        };
    }

    let subtotal: i64 = lines.iter().map(|l| l.unit_price * l.quantity).sum();
    let discount = coupon_amount.unwrap_or(0);
    let discounted_subtotal = (subtotal - discount).max(0);

    let shipping_fee = if discounted_subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    };

    Pricing {
        subtotal,
        discount,
        shipping_fee,
        total: discounted_subtotal + shipping_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(unit_price: i64, quantity: i64) -> CartLine {
        CartLine {
            unit_price,
            quantity,
        }
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        let p = price_cart(&[], None);
        assert_eq!(
            p,
            Pricing {
                subtotal: 0,
                discount: 0,
                shipping_fee: 0,
                total: 0
            }
        );
        // Coupon on an empty cart changes nothing, including the fee
        assert_eq!(price_cart(&[], Some(500)), p);
    }

    #[test]
    fn single_item_over_threshold_ships_free() {
        let p = price_cart(&[line(1280, 1)], None);
        assert_eq!(p.subtotal, 1280);
        assert_eq!(p.discount, 0);
        assert_eq!(p.shipping_fee, 0);
        assert_eq!(p.total, 1280);
    }

    #[test]
    fn below_threshold_pays_flat_fee() {
        let p = price_cart(&[line(450, 2)], None);
        assert_eq!(p.subtotal, 900);
        assert_eq!(p.shipping_fee, 100);
        assert_eq!(p.total, 1000);
    }

    #[test]
    fn coupon_can_push_cart_below_free_shipping() {
        let p = price_cart(&[line(900, 1)], Some(100));
        assert_eq!(p.subtotal, 900);
        assert_eq!(p.discount, 100);
        assert_eq!(p.shipping_fee, 100);
        assert_eq!(p.total, 900);
    }

    #[test]
    fn discounted_subtotal_exactly_at_threshold_ships_free() {
        let p = price_cart(&[line(1100, 1)], Some(100));
        assert_eq!(p.shipping_fee, 0);
        assert_eq!(p.total, 1000);
    }

    #[test]
    fn oversized_discount_keeps_face_value_but_never_goes_negative() {
        let p = price_cart(&[line(300, 1)], Some(500));
        assert_eq!(p.subtotal, 300);
        assert_eq!(p.discount, 500);
        assert_eq!(p.shipping_fee, FLAT_SHIPPING_FEE);
        assert_eq!(p.total, FLAT_SHIPPING_FEE);
    }

    proptest! {
        #[test]
        fn totals_reconcile(
            lines in prop::collection::vec((0i64..5_000, 1i64..20), 1..8),
            coupon in prop::option::of(0i64..2_000),
        ) {
            let cart: Vec<CartLine> = lines
                .iter()
                .map(|&(unit_price, quantity)| CartLine { unit_price, quantity })
                .collect();
            let p = price_cart(&cart, coupon);

            let expected_subtotal: i64 = lines.iter().map(|&(u, q)| u * q).sum();
            prop_assert_eq!(p.subtotal, expected_subtotal);
            prop_assert_eq!(p.discount, coupon.unwrap_or(0));

            let discounted = (p.subtotal - p.discount).max(0);
            if discounted >= FREE_SHIPPING_THRESHOLD {
                prop_assert_eq!(p.shipping_fee, 0);
            } else {
                prop_assert_eq!(p.shipping_fee, FLAT_SHIPPING_FEE);
            }
            prop_assert_eq!(p.total, discounted + p.shipping_fee);
            prop_assert!(p.total >= 0);
        }
    }
}
