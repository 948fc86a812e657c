//! Subscription Entity
//!
//! Every user has exactly one subscription row, created on the free plan at
//! sign-up. Paid plans buy a fixed period and higher quotas; once the period
//! lapses the free quotas apply again.

use chrono::{DateTime, Months, Utc};
use derive_more::Display;
use kernel::id::{SubscriptionId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::Cents;
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[display("free")]
    Free,
    #[display("monthly")]
    Monthly,
    #[display("annual")]
    Annual,
}

impl Plan {
    pub const fn code(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Monthly => "monthly",
            Plan::Annual => "annual",
        }
    }

    pub const fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    pub const fn price(&self) -> Cents {
        match self {
            Plan::Free => Cents(0),
            Plan::Monthly => Cents(9_900),
            Plan::Annual => Cents(99_900),
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Monthly => "Pro Monthly",
            Plan::Annual => "Pro Annual",
        }
    }

    const fn period(&self) -> Option<Months> {
        match self {
            Plan::Free => None,
            Plan::Monthly => Some(Months::new(1)),
            Plan::Annual => Some(Months::new(12)),
        }
    }

    /// Calendar-aware end of a period starting at `start`.
    /// Month-end starts clamp to the last day of the target month.
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.period().and_then(|months| start.checked_add_months(months))
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "free" => Ok(Plan::Free),
            "monthly" => Ok(Plan::Monthly),
            "annual" => Ok(Plan::Annual),
            other => Err(format!("unknown plan: {other}")),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[display("active")]
    Active,
    #[display("expired")]
    Expired,
    #[display("cancelled")]
    Cancelled,
}

impl SubscriptionStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("unknown subscription status: {other}")),
        }
    }
}

/// Quotas for one plan. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub bids: Option<u32>,
    pub services: Option<u32>,
}

impl PlanLimits {
    pub const UNLIMITED: PlanLimits = PlanLimits {
        bids: None,
        services: None,
    };

    pub const fn new(bids: u32, services: u32) -> Self {
        Self {
            bids: Some(bids),
            services: Some(services),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub bids_used: i32,
    pub services_used: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn free(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            bids_used: 0,
            services_used: 0,
            period_start: now,
            period_end: None,
            payment_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The plan whose quotas apply at `now`.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        if self.status != SubscriptionStatus::Active {
            return Plan::Free;
        }
        match self.period_end {
            Some(end) if end <= now => Plan::Free,
            _ => self.plan,
        }
    }

    pub fn apply_renewal(&mut self, renewal: &Renewal) {
        self.plan = renewal.plan;
        self.status = SubscriptionStatus::Active;
        self.bids_used = 0;
        self.period_start = renewal.period_start;
        self.period_end = Some(renewal.period_end);
        self.payment_reference = Some(renewal.payment_reference.clone());
        self.updated_at = renewal.period_start;
    }
}

/// A settled subscription payment, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewal {
    pub user_id: UserId,
    pub plan: Plan,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub payment_reference: String,
}

impl Renewal {
    pub fn settle(
        user_id: UserId,
        plan: Plan,
        settled_at: DateTime<Utc>,
        payment_reference: impl Into<String>,
    ) -> MarketplaceResult<Self> {
        if !plan.is_paid() {
            return Err(MarketplaceError::validation("The free plan cannot be purchased"));
        }
        let period_end = plan
            .period_end(settled_at)
            .ok_or_else(|| MarketplaceError::Internal(format!("period overflow for {plan}")))?;
        Ok(Self {
            user_id,
            plan,
            period_start: settled_at,
            period_end,
            payment_reference: payment_reference.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn monthly_adds_one_calendar_month() {
        let r = Renewal::settle(UserId::new(), Plan::Monthly, at(2025, 1, 15), "SUB-1").unwrap();
        assert_eq!(r.period_end, at(2025, 2, 15));

        let r = Renewal::settle(UserId::new(), Plan::Monthly, at(2025, 1, 31), "SUB-1").unwrap();
        assert_eq!(r.period_end, at(2025, 2, 28));
    }

    #[test]
    fn annual_adds_one_calendar_year() {
        let r = Renewal::settle(UserId::new(), Plan::Annual, at(2024, 2, 29), "SUB-1").unwrap();
        assert_eq!(r.period_end, at(2025, 2, 28));
        let r = Renewal::settle(UserId::new(), Plan::Annual, at(2025, 6, 1), "SUB-1").unwrap();
        assert_eq!(r.period_end, at(2026, 6, 1));
    }

    #[test]
    fn free_plan_is_not_for_sale() {
        assert!(Renewal::settle(UserId::new(), Plan::Free, Utc::now(), "SUB-1").is_err());
    }

    #[test]
    fn lapsed_period_falls_back_to_free() {
        let mut sub = Subscription::free(UserId::new());
        assert_eq!(sub.effective_plan(Utc::now()), Plan::Free);

        let renewal = Renewal::settle(sub.user_id, Plan::Monthly, at(2025, 1, 1), "SUB-1").unwrap();
        sub.bids_used = 7;
        sub.apply_renewal(&renewal);
        assert_eq!(sub.bids_used, 0);
        assert_eq!(sub.effective_plan(at(2025, 1, 20)), Plan::Monthly);
        assert_eq!(sub.effective_plan(at(2025, 2, 1)), Plan::Free);
    }

    #[test]
    fn prices() {
        assert_eq!(Plan::Monthly.price(), Cents(9900));
        assert_eq!(Plan::Annual.price(), Cents(99900));
    }
}
