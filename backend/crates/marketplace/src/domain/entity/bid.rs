//! Bid Entity

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{BidId, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::entity::project::Project;
use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[display("pending")]
    Pending,
    #[display("accepted")]
    Accepted,
    #[display("rejected")]
    Rejected,
    #[display("withdrawn")]
    Withdrawn,
}

impl BidStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
            BidStatus::Withdrawn => "withdrawn",
        }
    }
}

impl FromStr for BidStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "pending" => Ok(BidStatus::Pending),
            "accepted" => Ok(BidStatus::Accepted),
            "rejected" => Ok(BidStatus::Rejected),
            "withdrawn" => Ok(BidStatus::Withdrawn),
            other => Err(format!("unknown bid status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bid {
    pub id: BidId,
    pub project_id: ProjectId,
    pub freelancer_id: UserId,
    pub amount: Cents,
    pub delivery_days: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Checks everything that can be decided from the project alone.
    /// One-bid-per-freelancer and the plan quota are enforced by the store.
    pub fn place(
        project: &Project,
        freelancer_id: UserId,
        amount: Cents,
        delivery_days: i32,
        proposal: &str,
    ) -> MarketplaceResult<Self> {
        if !project.is_open() {
            return Err(MarketplaceError::conflict("Project is not accepting bids"));
        }
        if project.client_id == freelancer_id {
            return Err(MarketplaceError::forbidden("You cannot bid on your own project"));
        }
        if !amount.is_positive() {
            return Err(MarketplaceError::validation("Bid amount must be greater than zero"));
        }
        if amount > project.budget_max {
            return Err(MarketplaceError::validation(format!(
                "Bid amount cannot exceed the project budget of {}",
                project.budget_max
            )));
        }
        if !(1..=365).contains(&delivery_days) {
            return Err(MarketplaceError::validation(
                "Delivery time must be between 1 and 365 days",
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: BidId::new(),
            project_id: project.id,
            freelancer_id,
            amount,
            delivery_days,
            proposal: bounded_text("Proposal", proposal, 20, 5000)?,
            status: BidStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn withdraw(&mut self) -> MarketplaceResult<()> {
        if self.status != BidStatus::Pending {
            return Err(MarketplaceError::conflict(format!(
                "Only pending bids can be withdrawn, this bid is {}",
                self.status
            )));
        }
        self.status = BidStatus::Withdrawn;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::project::ProjectDraft;
    use kernel::id::CategoryId;

    fn project() -> Project {
        Project::new(
            UserId::new(),
            ProjectDraft::new(
                CategoryId::new(),
                "Translate a brochure",
                "Translate a twelve page brochure from English to isiZulu.",
                Cents(50_000),
                Cents(150_000),
            )
            .unwrap(),
        )
    }

    const PROPOSAL: &str = "Native isiZulu speaker, five years of translation work.";

    #[test]
    fn bid_must_fit_budget() {
        let project = project();
        assert!(Bid::place(&project, UserId::new(), Cents(150_000), 7, PROPOSAL).is_ok());
        let err = Bid::place(&project, UserId::new(), Cents(150_001), 7, PROPOSAL).unwrap_err();
        assert!(matches!(err, MarketplaceError::Validation(_)));
    }

    #[test]
    fn cannot_bid_on_own_or_closed_project() {
        let mut project = project();
        let err = Bid::place(&project, project.client_id, Cents(60_000), 7, PROPOSAL).unwrap_err();
        assert!(matches!(err, MarketplaceError::Forbidden(_)));

        project.cancel().unwrap();
        let err = Bid::place(&project, UserId::new(), Cents(60_000), 7, PROPOSAL).unwrap_err();
        assert!(matches!(err, MarketplaceError::Conflict(_)));
    }

    #[test]
    fn withdraw_only_pending() {
        let mut bid = Bid::place(&project(), UserId::new(), Cents(60_000), 7, PROPOSAL).unwrap();
        bid.withdraw().unwrap();
        assert_eq!(bid.status, BidStatus::Withdrawn);
        assert!(bid.withdraw().is_err());
    }
}
