//! Repository Traits
//!
//! Interfaces for data persistence. Postgres implementations live in
//! `infra::postgres`, the in-memory ones in `infra::memory`.
//!
//! Method names are unique across traits so one store type can implement
//! all of them without call-site disambiguation.

use kernel::id::{BidId, CategoryId, MilestoneId, NotificationId, OrderId, OutsourcingRequestId, ProjectId, ServiceId, UserId};
use kernel::pagination::{Page, PageRequest};
use serde::Serialize;

use crate::domain::entity::{
    Bid, Category, Conversation, LedgerEntry, Message, Milestone, Notification, Order,
    OrderStatus, OutsourcingRequest, OutsourcingStatus, Project, ProjectStatus, Renewal, Service,
    Subscription,
};
use crate::error::MarketplaceResult;

// ============================================================================
// Catalogue
// ============================================================================

#[trait_variant::make(CategoryRepository: Send)]
pub trait LocalCategoryRepository {
    async fn list_categories(&self) -> MarketplaceResult<Vec<Category>>;

    async fn find_category(&self, id: CategoryId) -> MarketplaceResult<Option<Category>>;

    /// Conflict when the slug is taken
    async fn create_category(&self, category: &Category) -> MarketplaceResult<()>;
}

/// Filters for the public service listing
#[derive(Debug, Clone, Default)]
pub struct ServiceQuery {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub seller_id: Option<UserId>,
    /// Include paused listings (owner view). Removed listings are never listed.
    pub include_paused: bool,
}

#[trait_variant::make(ServiceRepository: Send)]
pub trait LocalServiceRepository {
    /// Insert the listing and count it against the seller's quota in one
    /// transaction. `Ok(false)` when `services_used` already reached `limit`.
    async fn insert_service_within_quota(
        &self,
        service: &Service,
        limit: Option<u32>,
    ) -> MarketplaceResult<bool>;

    async fn find_service(&self, id: ServiceId) -> MarketplaceResult<Option<Service>>;

    async fn update_service(&self, service: &Service) -> MarketplaceResult<()>;

    /// Persist a removed listing and release its quota slot
    async fn retire_service(&self, service: &Service) -> MarketplaceResult<()>;

    async fn list_services(
        &self,
        query: &ServiceQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Service>>;
}

#[trait_variant::make(ShortlistRepository: Send)]
pub trait LocalShortlistRepository {
    /// No-op when already shortlisted
    async fn add_to_shortlist(&self, user_id: UserId, service_id: ServiceId) -> MarketplaceResult<()>;

    async fn remove_from_shortlist(
        &self,
        user_id: UserId,
        service_id: ServiceId,
    ) -> MarketplaceResult<bool>;

    /// Shortlisted services that are not removed, newest first
    async fn list_shortlist(&self, user_id: UserId) -> MarketplaceResult<Vec<Service>>;
}

// ============================================================================
// Projects and Bids
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub category_id: Option<CategoryId>,
    pub client_id: Option<UserId>,
}

#[trait_variant::make(ProjectRepository: Send)]
pub trait LocalProjectRepository {
    async fn create_project(&self, project: &Project) -> MarketplaceResult<()>;

    async fn find_project(&self, id: ProjectId) -> MarketplaceResult<Option<Project>>;

    async fn update_project(&self, project: &Project) -> MarketplaceResult<()>;

    async fn list_projects(
        &self,
        query: &ProjectQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Project>>;

    /// In one transaction: project to `in_progress` (only while open), the
    /// bid to `accepted`, every other pending bid to `rejected`, and the
    /// order inserted. `Ok(false)` if the project was no longer open.
    async fn award_bid(&self, project: &Project, bid: &Bid, order: &Order) -> MarketplaceResult<bool>;
}

#[trait_variant::make(BidRepository: Send)]
pub trait LocalBidRepository {
    /// Insert and count against `bids_used` in one transaction.
    /// `Ok(false)` when the quota is exhausted; conflict on a second bid by
    /// the same freelancer on the same project.
    async fn insert_bid_within_quota(&self, bid: &Bid, limit: Option<u32>) -> MarketplaceResult<bool>;

    async fn find_bid(&self, id: BidId) -> MarketplaceResult<Option<Bid>>;

    async fn update_bid(&self, bid: &Bid) -> MarketplaceResult<()>;

    async fn list_bids_for_project(&self, project_id: ProjectId) -> MarketplaceResult<Vec<Bid>>;

    async fn list_bids_by_freelancer(
        &self,
        freelancer_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Bid>>;
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderRole {
    Buyer,
    Seller,
    #[default]
    Any,
}

#[trait_variant::make(OrderRepository: Send)]
pub trait LocalOrderRepository {
    async fn create_order(&self, order: &Order) -> MarketplaceResult<()>;

    async fn find_order(&self, id: OrderId) -> MarketplaceResult<Option<Order>>;

    /// Compare-and-set on the status. `Ok(false)` if another request moved
    /// the order away from `expected` first.
    async fn save_order(&self, order: &Order, expected: OrderStatus) -> MarketplaceResult<bool>;

    /// Newest first, where `user_id` is the given party
    async fn list_orders(
        &self,
        user_id: UserId,
        role: OrderRole,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Order>>;

    async fn add_milestone(&self, milestone: &Milestone) -> MarketplaceResult<()>;

    async fn find_milestone(&self, id: MilestoneId) -> MarketplaceResult<Option<Milestone>>;

    /// Oldest first
    async fn list_milestones(&self, order_id: OrderId) -> MarketplaceResult<Vec<Milestone>>;
}

// ============================================================================
// Communication
// ============================================================================

#[trait_variant::make(MessageRepository: Send)]
pub trait LocalMessageRepository {
    async fn user_exists(&self, user_id: UserId) -> MarketplaceResult<bool>;

    async fn insert_message(&self, message: &Message) -> MarketplaceResult<()>;

    /// Both directions between the two users, newest first
    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Message>>;

    /// Mark messages from `other_id` to `user_id` as read
    async fn mark_conversation_read(&self, user_id: UserId, other_id: UserId) -> MarketplaceResult<u64>;

    /// Latest message per counterpart plus unread counts, most recent first
    async fn inbox(&self, user_id: UserId) -> MarketplaceResult<Vec<Conversation>>;
}

#[trait_variant::make(NotificationRepository: Send)]
pub trait LocalNotificationRepository {
    async fn insert_notification(&self, notification: &Notification) -> MarketplaceResult<()>;

    async fn list_notifications(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Notification>>;

    async fn count_unread_notifications(&self, user_id: UserId) -> MarketplaceResult<i64>;

    /// `Ok(false)` if the notification is not the user's
    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> MarketplaceResult<bool>;

    async fn mark_all_notifications_read(&self, user_id: UserId) -> MarketplaceResult<u64>;
}

#[trait_variant::make(OutsourcingRepository: Send)]
pub trait LocalOutsourcingRepository {
    async fn create_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()>;

    async fn find_outsourcing_request(
        &self,
        id: OutsourcingRequestId,
    ) -> MarketplaceResult<Option<OutsourcingRequest>>;

    async fn update_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()>;

    async fn list_outsourcing_requests(
        &self,
        requester_id: Option<UserId>,
        status: Option<OutsourcingStatus>,
        page: PageRequest,
    ) -> MarketplaceResult<Page<OutsourcingRequest>>;
}

// ============================================================================
// Billing
// ============================================================================

/// Result of a ledger write keyed by `(provider, provider_reference)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    /// Ledger row inserted and the state change applied
    Applied,
    /// The reference was already settled; nothing changed
    Duplicate,
}

/// Result of an escrow ledger write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowWrite {
    /// `order_started` is false when the order had already left
    /// `awaiting_payment`; the ledger row is recorded regardless.
    Applied { order_started: bool },
    Duplicate,
}

#[trait_variant::make(SubscriptionRepository: Send)]
pub trait LocalSubscriptionRepository {
    async fn find_subscription(&self, user_id: UserId) -> MarketplaceResult<Option<Subscription>>;
}

#[trait_variant::make(LedgerRepository: Send)]
pub trait LocalLedgerRepository {
    /// In one transaction: insert the ledger row unless its reference is
    /// already recorded, then upsert the user's subscription.
    async fn record_subscription_payment(
        &self,
        entry: &LedgerEntry,
        renewal: &Renewal,
    ) -> MarketplaceResult<LedgerWrite>;

    /// In one transaction: insert the ledger row unless its reference is
    /// already recorded, move the order out of `awaiting_payment` and mark
    /// the milestone funded.
    async fn record_escrow_funding(
        &self,
        entry: &LedgerEntry,
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    ) -> MarketplaceResult<EscrowWrite>;

    async fn list_ledger(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<LedgerEntry>>;
}

// ============================================================================
// Moderation
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: i64,
    pub suspended_users: i64,
    pub active_services: i64,
    pub open_projects: i64,
    pub orders_in_progress: i64,
    pub disputed_orders: i64,
    pub completed_orders: i64,
    pub pending_outsourcing_requests: i64,
    pub escrow_funded_cents: i64,
    pub subscription_revenue_cents: i64,
}

#[trait_variant::make(StatsRepository: Send)]
pub trait LocalStatsRepository {
    async fn platform_stats(&self) -> MarketplaceResult<PlatformStats>;
}

/// Everything the marketplace routes need from one store
pub trait MarketplaceStore:
    CategoryRepository
    + ServiceRepository
    + ShortlistRepository
    + ProjectRepository
    + BidRepository
    + OrderRepository
    + MessageRepository
    + NotificationRepository
    + OutsourcingRepository
    + SubscriptionRepository
    + LedgerRepository
    + StatsRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: CategoryRepository
        + ServiceRepository
        + ShortlistRepository
        + ProjectRepository
        + BidRepository
        + OrderRepository
        + MessageRepository
        + NotificationRepository
        + OutsourcingRepository
        + SubscriptionRepository
        + LedgerRepository
        + StatsRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
