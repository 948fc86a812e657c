//! Subscription and ledger views for the signed-in user.

use std::sync::Arc;

use auth::Identity;
use chrono::{DateTime, Utc};
use kernel::pagination::{Page, PageRequest};

use crate::application::config::MarketplaceConfig;
use crate::domain::entity::{LedgerEntry, Plan, PlanLimits, Subscription, SubscriptionStatus};
use crate::domain::repository::{LedgerRepository, SubscriptionRepository};
use crate::error::MarketplaceResult;

/// Subscription as the user sees it, with the quotas in force now
#[derive(Debug, Clone)]
pub struct SubscriptionView {
    pub plan: Plan,
    pub effective_plan: Plan,
    pub status: SubscriptionStatus,
    pub limits: PlanLimits,
    pub bids_used: i32,
    pub services_used: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
}

impl SubscriptionView {
    fn new(subscription: &Subscription, config: &MarketplaceConfig, now: DateTime<Utc>) -> Self {
        let effective_plan = subscription.effective_plan(now);
        Self {
            plan: subscription.plan,
            effective_plan,
            status: subscription.status,
            limits: config.limits_for(effective_plan),
            bids_used: subscription.bids_used,
            services_used: subscription.services_used,
            period_start: subscription.period_start,
            period_end: subscription.period_end,
        }
    }
}

pub struct BillingUseCase<R>
where
    R: SubscriptionRepository + LedgerRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> BillingUseCase<R>
where
    R: SubscriptionRepository + LedgerRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    /// Users registered before subscriptions existed have no row; they
    /// are shown the free plan.
    pub async fn my_subscription(&self, identity: &Identity) -> MarketplaceResult<SubscriptionView> {
        let subscription = self
            .repo
            .find_subscription(identity.user_id)
            .await?
            .unwrap_or_else(|| Subscription::free(identity.user_id));
        Ok(SubscriptionView::new(&subscription, &self.config, Utc::now()))
    }

    pub async fn my_transactions(
        &self,
        identity: &Identity,
        page: PageRequest,
    ) -> MarketplaceResult<Page<LedgerEntry>> {
        self.repo.list_ledger(identity.user_id, page).await
    }
}
