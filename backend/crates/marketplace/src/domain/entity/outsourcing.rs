//! Outsourcing Requests
//!
//! A client asks the platform team to find and manage freelancers for them.
//! Moderators triage the requests.

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{OutsourcingRequestId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutsourcingStatus {
    #[display("pending")]
    Pending,
    #[display("in_review")]
    InReview,
    #[display("accepted")]
    Accepted,
    #[display("declined")]
    Declined,
}

impl OutsourcingStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            OutsourcingStatus::Pending => "pending",
            OutsourcingStatus::InReview => "in_review",
            OutsourcingStatus::Accepted => "accepted",
            OutsourcingStatus::Declined => "declined",
        }
    }

    pub const fn is_final(&self) -> bool {
        matches!(self, OutsourcingStatus::Accepted | OutsourcingStatus::Declined)
    }
}

impl FromStr for OutsourcingStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "pending" => Ok(OutsourcingStatus::Pending),
            "in_review" => Ok(OutsourcingStatus::InReview),
            "accepted" => Ok(OutsourcingStatus::Accepted),
            "declined" => Ok(OutsourcingStatus::Declined),
            other => Err(format!("unknown outsourcing status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutsourcingRequest {
    pub id: OutsourcingRequestId,
    pub requester_id: UserId,
    pub title: String,
    pub description: String,
    pub budget: Cents,
    pub status: OutsourcingStatus,
    pub reviewer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutsourcingRequest {
    pub fn submit(
        requester_id: UserId,
        title: &str,
        description: &str,
        budget: Cents,
    ) -> MarketplaceResult<Self> {
        if !budget.is_positive() {
            return Err(MarketplaceError::validation("Budget must be greater than zero"));
        }
        let now = Utc::now();
        Ok(Self {
            id: OutsourcingRequestId::new(),
            requester_id,
            title: bounded_text("Title", title, 5, 120)?,
            description: bounded_text("Description", description, 20, 10_000)?,
            budget,
            status: OutsourcingStatus::Pending,
            reviewer_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn review(
        &mut self,
        status: OutsourcingStatus,
        notes: Option<String>,
    ) -> MarketplaceResult<()> {
        if self.status.is_final() {
            return Err(MarketplaceError::conflict(format!(
                "Request was already {}",
                self.status
            )));
        }
        if status == OutsourcingStatus::Pending {
            return Err(MarketplaceError::validation("A review cannot reset a request to pending"));
        }
        self.status = status;
        self.reviewer_notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_flow() {
        let mut request = OutsourcingRequest::submit(
            UserId::new(),
            "Build our ERP",
            "We need a team to build and maintain an ERP for 40 staff.",
            Cents(5_000_000),
        )
        .unwrap();

        assert!(request.review(OutsourcingStatus::Pending, None).is_err());
        request.review(OutsourcingStatus::InReview, Some("  ".into())).unwrap();
        assert_eq!(request.reviewer_notes, None);
        request
            .review(OutsourcingStatus::Accepted, Some("Assigned to the Cape Town team".into()))
            .unwrap();
        assert!(request.review(OutsourcingStatus::Declined, None).is_err());
    }
}
