//! API DTOs (Data Transfer Objects)
//!
//! Money travels as integer cents (`...Cents` fields).

use chrono::{DateTime, Utc};
use kernel::id::{
    BidId, CategoryId, MessageId, MilestoneId, NotificationId, OrderId, OutsourcingRequestId,
    ProjectId, ServiceId, TransactionId, UserId,
};
use kernel::pagination::{DEFAULT_PER_PAGE, PageRequest};
use serde::{Deserialize, Serialize};

use crate::application::SubscriptionView;
use crate::domain::entity::{
    Bid, BidStatus, Category, Conversation, DisputeOutcome, LedgerEntry, LedgerStatus, Message,
    Milestone, MilestoneStatus, Notification, Order, OrderOrigin, OrderStatus, OutsourcingRequest,
    OutsourcingStatus, PaymentProvider, Plan, PlanLimits, Project, ProjectStatus, Service,
    ServiceStatus, SubscriptionStatus, TransactionKind,
};
use crate::domain::repository::OrderRole;
use crate::domain::value_object::Cents;

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

// ============================================================================
// Catalogue
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug.as_str().to_string(),
        }
    }
}

/// Create and update share one body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub price_cents: Cents,
    pub delivery_days: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServicesQuery {
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListServicesQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: ServiceId,
    pub seller_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub price_cents: Cents,
    pub price: String,
    pub delivery_days: i32,
    pub status: ServiceStatus,
    pub removed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Service> for ServiceResponse {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            seller_id: s.seller_id,
            category_id: s.category_id,
            title: s.title,
            description: s.description,
            price_cents: s.price,
            price: s.price.to_string(),
            delivery_days: s.delivery_days,
            status: s.status,
            removed_reason: s.removed_reason,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

// ============================================================================
// Projects and Bids
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub budget_min_cents: Cents,
    pub budget_max_cents: Cents,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub category: Option<CategoryId>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListProjectsQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: ProjectId,
    pub client_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub budget_min_cents: Cents,
    pub budget_max_cents: Cents,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            client_id: p.client_id,
            category_id: p.category_id,
            title: p.title,
            description: p.description,
            budget_min_cents: p.budget_min,
            budget_max_cents: p.budget_max,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidRequest {
    pub amount_cents: Cents,
    pub delivery_days: i32,
    pub proposal: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub id: BidId,
    pub project_id: ProjectId,
    pub freelancer_id: UserId,
    pub amount_cents: Cents,
    pub delivery_days: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Bid> for BidResponse {
    fn from(b: Bid) -> Self {
        Self {
            id: b.id,
            project_id: b.project_id,
            freelancer_id: b.freelancer_id,
            amount_cents: b.amount,
            delivery_days: b.delivery_days,
            proposal: b.proposal,
            status: b.status,
            created_at: b.created_at,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderServiceRequest {
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub role: OrderRole,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListOrdersQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMilestoneRequest {
    pub title: String,
    pub amount_cents: Cents,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub service_id: Option<ServiceId>,
    pub project_id: Option<ProjectId>,
    pub bid_id: Option<BidId>,
    pub title: String,
    pub requirements: Option<String>,
    pub amount_cents: Cents,
    pub status: OrderStatus,
    pub delivery_message: Option<String>,
    pub dispute_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        let (service_id, project_id, bid_id) = match o.origin {
            OrderOrigin::Service(id) => (Some(id), None, None),
            OrderOrigin::Bid { project_id, bid_id } => (None, Some(project_id), Some(bid_id)),
        };
        Self {
            id: o.id,
            buyer_id: o.buyer_id,
            seller_id: o.seller_id,
            service_id,
            project_id,
            bid_id,
            title: o.title,
            requirements: o.requirements,
            amount_cents: o.amount,
            status: o.status,
            delivery_message: o.delivery_message,
            dispute_reason: o.dispute_reason,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneResponse {
    pub id: MilestoneId,
    pub title: String,
    pub amount_cents: Cents,
    pub status: MilestoneStatus,
    pub funded_at: Option<DateTime<Utc>>,
}

impl From<Milestone> for MilestoneResponse {
    fn from(m: Milestone) -> Self {
        Self {
            id: m.id,
            title: m.title,
            amount_cents: m.amount,
            status: m.status,
            funded_at: m.funded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub milestones: Vec<MilestoneResponse>,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: UserId,
    pub body: String,
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub order_id: Option<OrderId>,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            order_id: m.order_id,
            body: m.body,
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub counterpart_id: UserId,
    pub last_message: MessageResponse,
    pub unread_count: i64,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            counterpart_id: c.counterpart_id,
            last_message: c.last_message.into(),
            unread_count: c.unread_count,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    #[serde(default)]
    pub count: bool,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl NotificationsQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    MarkRead,
    MarkAllRead,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationActionRequest {
    pub action: NotificationAction,
    pub notification_id: Option<NotificationId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            link: n.link,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedReadResponse {
    pub success: bool,
    pub marked: u64,
}

// ============================================================================
// Outsourcing
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutsourcingRequestBody {
    pub title: String,
    pub description: String,
    pub budget_cents: Cents,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOutsourcingQuery {
    pub status: Option<OutsourcingStatus>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListOutsourcingQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutsourcingRequest {
    pub status: OutsourcingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutsourcingResponse {
    pub id: OutsourcingRequestId,
    pub requester_id: UserId,
    pub title: String,
    pub description: String,
    pub budget_cents: Cents,
    pub status: OutsourcingStatus,
    pub reviewer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OutsourcingRequest> for OutsourcingResponse {
    fn from(r: OutsourcingRequest) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            title: r.title,
            description: r.description,
            budget_cents: r.budget,
            status: r.status,
            reviewer_notes: r.reviewer_notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ============================================================================
// Billing
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub plan: Plan,
    pub plan_name: &'static str,
    pub effective_plan: Plan,
    pub status: SubscriptionStatus,
    pub limits: PlanLimits,
    pub bids_used: i32,
    pub services_used: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(v: SubscriptionView) -> Self {
        Self {
            plan: v.plan,
            plan_name: v.plan.display_name(),
            effective_plan: v.effective_plan,
            status: v.status,
            limits: v.limits,
            bids_used: v.bids_used,
            services_used: v.services_used,
            period_start: v.period_start,
            period_end: v.period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub provider: PaymentProvider,
    pub reference: String,
    pub order_id: Option<OrderId>,
    pub status: LedgerStatus,
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<LedgerEntry> for TransactionResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id,
            kind: e.kind,
            provider: e.provider,
            reference: e.provider_reference,
            order_id: e.order_id,
            status: e.status,
            amount_cents: e.amount,
            created_at: e.created_at,
            completed_at: e.completed_at,
        }
    }
}

// ============================================================================
// Moderation
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveServiceRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDisputeRequest {
    pub outcome: DisputeOutcome,
    pub note: Option<String>,
}
