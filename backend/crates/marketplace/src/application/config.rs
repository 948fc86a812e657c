//! Marketplace configuration: plan quotas.

use chrono::{DateTime, Utc};

use crate::domain::entity::{Plan, PlanLimits, Subscription};

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub free_limits: PlanLimits,
    pub monthly_limits: PlanLimits,
    pub annual_limits: PlanLimits,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            free_limits: PlanLimits::new(10, 3),
            monthly_limits: PlanLimits::new(100, 20),
            annual_limits: PlanLimits::UNLIMITED,
        }
    }
}

impl MarketplaceConfig {
    pub fn development() -> Self {
        Self::default()
    }

    pub fn limits_for(&self, plan: Plan) -> PlanLimits {
        match plan {
            Plan::Free => self.free_limits,
            Plan::Monthly => self.monthly_limits,
            Plan::Annual => self.annual_limits,
        }
    }

    /// Quotas that apply to a subscription right now. Users without a row
    /// get the free quotas.
    pub fn limits_at(&self, subscription: Option<&Subscription>, now: DateTime<Utc>) -> PlanLimits {
        let plan = subscription.map_or(Plan::Free, |s| s.effective_plan(now));
        self.limits_for(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kernel::id::UserId;

    #[test]
    fn expired_paid_plan_uses_free_limits() {
        let config = MarketplaceConfig::default();
        let mut sub = Subscription::free(UserId::new());
        sub.plan = Plan::Monthly;
        sub.period_end = Some(Utc::now() + Duration::days(3));
        assert_eq!(config.limits_at(Some(&sub), Utc::now()).bids, Some(100));

        sub.period_end = Some(Utc::now() - Duration::days(1));
        assert_eq!(config.limits_at(Some(&sub), Utc::now()).bids, Some(10));
        assert_eq!(config.limits_at(None, Utc::now()).services, Some(3));
    }

    #[test]
    fn annual_is_unlimited() {
        let config = MarketplaceConfig::default();
        assert_eq!(config.limits_for(Plan::Annual), PlanLimits::UNLIMITED);
    }
}
