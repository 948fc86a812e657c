//! Service Entity
//!
//! A fixed-price gig listed by a seller. Removal is soft: the row stays so
//! existing orders keep their reference.

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{CategoryId, ServiceId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

pub const MAX_DELIVERY_DAYS: i32 = 90;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[display("active")]
    Active,
    #[display("paused")]
    Paused,
    #[display("removed")]
    Removed,
}

impl ServiceStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            ServiceStatus::Active => "active",
            ServiceStatus::Paused => "paused",
            ServiceStatus::Removed => "removed",
        }
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "active" => Ok(ServiceStatus::Active),
            "paused" => Ok(ServiceStatus::Paused),
            "removed" => Ok(ServiceStatus::Removed),
            other => Err(format!("unknown service status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub seller_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub delivery_days: i32,
    pub status: ServiceStatus,
    pub removed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated listing fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct ServiceDraft {
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub delivery_days: i32,
}

impl ServiceDraft {
    pub fn new(
        category_id: CategoryId,
        title: &str,
        description: &str,
        price: Cents,
        delivery_days: i32,
    ) -> MarketplaceResult<Self> {
        if !price.is_positive() {
            return Err(MarketplaceError::validation("Price must be greater than zero"));
        }
        if !(1..=MAX_DELIVERY_DAYS).contains(&delivery_days) {
            return Err(MarketplaceError::validation(format!(
                "Delivery time must be between 1 and {MAX_DELIVERY_DAYS} days"
            )));
        }
        Ok(Self {
            category_id,
            title: bounded_text("Title", title, 5, 100)?,
            description: bounded_text("Description", description, 20, 5000)?,
            price,
            delivery_days,
        })
    }
}

impl Service {
    pub fn new(seller_id: UserId, draft: ServiceDraft) -> Self {
        let now = Utc::now();
        Self {
            id: ServiceId::new(),
            seller_id,
            category_id: draft.category_id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            delivery_days: draft.delivery_days,
            status: ServiceStatus::Active,
            removed_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: ServiceDraft) {
        self.category_id = draft.category_id;
        self.title = draft.title;
        self.description = draft.description;
        self.price = draft.price;
        self.delivery_days = draft.delivery_days;
        self.updated_at = Utc::now();
    }

    pub fn is_orderable(&self) -> bool {
        self.status == ServiceStatus::Active
    }

    /// Owner toggles between active and paused; removed is final.
    pub fn set_paused(&mut self, paused: bool) -> MarketplaceResult<()> {
        if self.status == ServiceStatus::Removed {
            return Err(MarketplaceError::conflict("Service has been removed"));
        }
        self.status = if paused {
            ServiceStatus::Paused
        } else {
            ServiceStatus::Active
        };
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove(&mut self, reason: Option<String>) -> MarketplaceResult<()> {
        if self.status == ServiceStatus::Removed {
            return Err(MarketplaceError::conflict("Service has already been removed"));
        }
        self.status = ServiceStatus::Removed;
        self.removed_reason = reason;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ServiceDraft {
        ServiceDraft::new(
            CategoryId::new(),
            "I will design your logo",
            "Three concepts, unlimited revisions, source files included.",
            Cents(45000),
            5,
        )
        .unwrap()
    }

    #[test]
    fn draft_validation() {
        assert!(
            ServiceDraft::new(CategoryId::new(), "Logo", "x".repeat(30).as_str(), Cents(100), 3)
                .is_err()
        );
        assert!(
            ServiceDraft::new(CategoryId::new(), "Logo design", "x".repeat(30).as_str(), Cents(0), 3)
                .is_err()
        );
        assert!(
            ServiceDraft::new(CategoryId::new(), "Logo design", "x".repeat(30).as_str(), Cents(100), 91)
                .is_err()
        );
    }

    #[test]
    fn pause_activate_remove() {
        let mut service = Service::new(UserId::new(), draft());
        assert!(service.is_orderable());

        service.set_paused(true).unwrap();
        assert!(!service.is_orderable());
        service.set_paused(false).unwrap();
        assert!(service.is_orderable());

        service.remove(Some("Counterfeit goods".into())).unwrap();
        assert!(service.set_paused(false).is_err());
        assert!(service.remove(None).is_err());
    }
}
