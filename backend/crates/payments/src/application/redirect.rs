//! Browser returns from the gateways' hosted pages.
//!
//! The gateway may or may not echo our identifiers back, so the order is
//! recovered from whatever the query carries.

use std::collections::HashMap;
use std::str::FromStr;

use derive_more::Display;
use kernel::id::{MilestoneId, OrderId};

use crate::domain::reference::order_id_from_reference;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    #[display("success")]
    Success,
    #[display("cancel")]
    Cancel,
    #[display("error")]
    Error,
}

impl ReturnOutcome {
    /// Value of the `payment` query parameter on the frontend page
    pub const fn payment_status(&self) -> &'static str {
        match self {
            ReturnOutcome::Success => "success",
            ReturnOutcome::Cancel => "cancelled",
            ReturnOutcome::Error => "failed",
        }
    }
}

impl FromStr for ReturnOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ReturnOutcome::Success),
            "cancel" => Ok(ReturnOutcome::Cancel),
            "error" => Ok(ReturnOutcome::Error),
            other => Err(format!("unknown return outcome: {other}")),
        }
    }
}

const REFERENCE_KEYS: [&str; 3] = ["TransactionReference", "m_payment_id", "reference"];

/// Frontend path for the user to land on
pub fn return_path(outcome: ReturnOutcome, query: &HashMap<String, String>) -> String {
    let value = |key: &str| {
        query
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };
    let status = outcome.payment_status();

    if value("kind") == Some("subscription") {
        return format!("/subscription?payment={status}");
    }

    let order_id = value("orderId")
        .or_else(|| value("Optional1"))
        .and_then(|v| v.parse::<OrderId>().ok())
        .or_else(|| {
            REFERENCE_KEYS
                .iter()
                .filter_map(|key| value(key))
                .find_map(order_id_from_reference)
        });
    let milestone_id = value("milestoneId")
        .or_else(|| value("Optional2"))
        .and_then(|v| v.parse::<MilestoneId>().ok());

    match (order_id, milestone_id) {
        (Some(order_id), Some(milestone_id)) => {
            format!("/orders/{order_id}?payment={status}&milestone={milestone_id}")
        }
        (Some(order_id), None) => format!("/orders/{order_id}?payment={status}"),
        (None, _) => format!("/orders?payment={status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn order_from_our_own_parameters() {
        let order_id = OrderId::new();
        let oid = order_id.to_string();
        assert_eq!(
            return_path(ReturnOutcome::Success, &query(&[("orderId", &oid)])),
            format!("/orders/{order_id}?payment=success")
        );
    }

    #[test]
    fn order_from_ozow_optionals_or_reference() {
        let order_id = OrderId::new();
        let milestone_id = MilestoneId::new();
        let (oid, mid) = (order_id.to_string(), milestone_id.to_string());
        assert_eq!(
            return_path(
                ReturnOutcome::Cancel,
                &query(&[("Optional1", &oid), ("Optional2", &mid)])
            ),
            format!("/orders/{order_id}?payment=cancelled&milestone={milestone_id}")
        );

        let reference = format!("ORD-{order_id}-0A1B2C3D");
        assert_eq!(
            return_path(
                ReturnOutcome::Error,
                &query(&[("TransactionReference", &reference)])
            ),
            format!("/orders/{order_id}?payment=failed")
        );
    }

    #[test]
    fn falls_back_to_order_list_or_subscription() {
        assert_eq!(
            return_path(ReturnOutcome::Success, &query(&[("orderId", "nope")])),
            "/orders?payment=success"
        );
        assert_eq!(
            return_path(ReturnOutcome::Success, &query(&[("kind", "subscription")])),
            "/subscription?payment=success"
        );
    }

    #[test]
    fn outcomes_from_path() {
        assert_eq!("cancel".parse::<ReturnOutcome>(), Ok(ReturnOutcome::Cancel));
        assert!("initiate".parse::<ReturnOutcome>().is_err());
    }
}
