//! Payment ledger rows.
//!
//! Rows are appended once per settled gateway reference and never updated.

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{MilestoneId, OrderId, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::Cents;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[display("subscription")]
    Subscription,
    #[display("escrow_fund")]
    EscrowFund,
}

impl TransactionKind {
    pub const fn code(&self) -> &'static str {
        match self {
            TransactionKind::Subscription => "subscription",
            TransactionKind::EscrowFund => "escrow_fund",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "subscription" => Ok(TransactionKind::Subscription),
            "escrow_fund" => Ok(TransactionKind::EscrowFund),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[display("payfast")]
    PayFast,
    #[display("ozow")]
    Ozow,
}

impl PaymentProvider {
    pub const fn code(&self) -> &'static str {
        match self {
            PaymentProvider::PayFast => "payfast",
            PaymentProvider::Ozow => "ozow",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "payfast" => Ok(PaymentProvider::PayFast),
            "ozow" => Ok(PaymentProvider::Ozow),
            other => Err(format!("unknown payment provider: {other}")),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    #[display("completed")]
    Completed,
    #[display("failed")]
    Failed,
}

impl LedgerStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            LedgerStatus::Completed => "completed",
            LedgerStatus::Failed => "failed",
        }
    }
}

impl FromStr for LedgerStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "completed" => Ok(LedgerStatus::Completed),
            "failed" => Ok(LedgerStatus::Failed),
            other => Err(format!("unknown ledger status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: UserId,
    pub order_id: Option<OrderId>,
    pub milestone_id: Option<MilestoneId>,
    pub kind: TransactionKind,
    pub provider: PaymentProvider,
    pub provider_reference: String,
    pub provider_transaction_id: Option<String>,
    pub status: LedgerStatus,
    pub amount: Cents,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// A settled payment. `(provider, provider_reference)` is unique.
    pub fn completed(
        user_id: UserId,
        kind: TransactionKind,
        provider: PaymentProvider,
        provider_reference: impl Into<String>,
        provider_transaction_id: Option<String>,
        amount: Cents,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            order_id: None,
            milestone_id: None,
            kind,
            provider,
            provider_reference: provider_reference.into(),
            provider_transaction_id,
            status: LedgerStatus::Completed,
            amount,
            created_at: settled_at,
            completed_at: Some(settled_at),
        }
    }

    pub fn for_order(mut self, order_id: OrderId, milestone_id: Option<MilestoneId>) -> Self {
        self.order_id = Some(order_id);
        self.milestone_id = milestone_id;
        self
    }
}
