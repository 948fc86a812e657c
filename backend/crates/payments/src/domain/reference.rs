//! Merchant references sent to the gateways.
//!
//! `SUB-{16 hex}` for subscriptions, `ORD-{order uuid}-{8 hex}` for escrow.
//! The random suffix makes every checkout attempt a distinct idempotency
//! key while the order id stays recoverable from the reference alone.

use kernel::id::OrderId;
use platform::crypto::random_hex;

pub const SUBSCRIPTION_PREFIX: &str = "SUB-";
pub const ORDER_PREFIX: &str = "ORD-";

const UUID_LEN: usize = 36;

pub fn subscription_reference() -> String {
    format!("{SUBSCRIPTION_PREFIX}{}", random_hex(8).to_uppercase())
}

pub fn order_reference(order_id: OrderId) -> String {
    format!("{ORDER_PREFIX}{order_id}-{}", random_hex(4).to_uppercase())
}

pub fn is_subscription_reference(reference: &str) -> bool {
    reference.starts_with(SUBSCRIPTION_PREFIX)
}

pub fn is_order_reference(reference: &str) -> bool {
    reference.starts_with(ORDER_PREFIX)
}

/// Order id embedded in an `ORD-` reference
pub fn order_id_from_reference(reference: &str) -> Option<OrderId> {
    reference
        .strip_prefix(ORDER_PREFIX)?
        .get(..UUID_LEN)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_reference_shape() {
        let reference = subscription_reference();
        assert!(is_subscription_reference(&reference));
        assert_eq!(reference.len(), SUBSCRIPTION_PREFIX.len() + 16);
        assert_ne!(reference, subscription_reference());
    }

    #[test]
    fn order_reference_round_trips_the_order_id() {
        let order_id = OrderId::new();
        let reference = order_reference(order_id);
        assert!(is_order_reference(&reference));
        assert_eq!(reference.len(), ORDER_PREFIX.len() + UUID_LEN + 1 + 8);
        assert_eq!(order_id_from_reference(&reference), Some(order_id));
    }

    #[test]
    fn malformed_order_references() {
        assert_eq!(order_id_from_reference("ORD-123"), None);
        assert_eq!(order_id_from_reference("SUB-0123456789ABCDEF"), None);
        assert_eq!(order_id_from_reference("ORD-not-a-uuid-at-all-but-long-enough-x"), None);
    }
}
