//! In-memory marketplace store.
//!
//! Implements every repository trait behind one mutex, so the multi-step
//! writes (quotas, awards, ledger settlement) are atomic the same way the
//! Postgres transactions are. Used by the tests of this crate and of
//! `payments`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{
    BidId, CategoryId, MilestoneId, NotificationId, OrderId, OutsourcingRequestId, ProjectId,
    ServiceId, UserId,
};
use kernel::pagination::{Page, PageRequest};
use tokio::sync::Mutex;

use crate::domain::entity::{
    Bid, BidStatus, Category, Conversation, LedgerEntry, Message, Milestone, MilestoneStatus,
    Notification, Order, OrderStatus, OutsourcingRequest, OutsourcingStatus, Project,
    ProjectStatus, Renewal, Service, ServiceStatus, Subscription, TransactionKind,
};
use crate::domain::repository::{
    BidRepository, CategoryRepository, EscrowWrite, LedgerRepository, LedgerWrite,
    MessageRepository, NotificationRepository, OrderRepository, OrderRole, OutsourcingRepository,
    PlatformStats, ProjectQuery, ProjectRepository, ServiceQuery, ServiceRepository,
    ShortlistRepository, StatsRepository, SubscriptionRepository,
};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Default)]
struct State {
    users: HashSet<UserId>,
    categories: Vec<Category>,
    services: Vec<Service>,
    shortlist: Vec<(UserId, ServiceId)>,
    projects: Vec<Project>,
    bids: Vec<Bid>,
    orders: Vec<Order>,
    milestones: Vec<Milestone>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    outsourcing: Vec<OutsourcingRequest>,
    subscriptions: HashMap<UserId, Subscription>,
    ledger: Vec<LedgerEntry>,
}

impl State {
    fn subscription_mut(&mut self, user_id: UserId) -> &mut Subscription {
        self.subscriptions
            .entry(user_id)
            .or_insert_with(|| Subscription::free(user_id))
    }

    fn is_recorded(&self, entry: &LedgerEntry) -> bool {
        self.ledger.iter().any(|e| {
            e.provider == entry.provider && e.provider_reference == entry.provider_reference
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryMarketplaceRepository {
    inner: Arc<Mutex<State>>,
}

/// Newest first; items are stored oldest first so equal timestamps keep
/// insertion order.
fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().cloned().collect();
    out.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    out
}

impl MemoryMarketplaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror of sign-up: the user exists and has a free subscription.
    pub async fn register_user(&self, user_id: UserId) {
        let mut state = self.inner.lock().await;
        state.users.insert(user_id);
        state.subscription_mut(user_id);
    }

    pub async fn put_subscription(&self, subscription: Subscription) {
        let mut state = self.inner.lock().await;
        state.users.insert(subscription.user_id);
        state.subscriptions.insert(subscription.user_id, subscription);
    }

    pub async fn notifications_for(&self, user_id: UserId) -> Vec<Notification> {
        let state = self.inner.lock().await;
        state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn notification_count(&self) -> usize {
        self.inner.lock().await.notifications.len()
    }

    pub async fn ledger(&self) -> Vec<LedgerEntry> {
        self.inner.lock().await.ledger.clone()
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.lock().await.subscriptions.len()
    }
}

// ============================================================================
// Catalogue
// ============================================================================

impl CategoryRepository for MemoryMarketplaceRepository {
    async fn list_categories(&self) -> MarketplaceResult<Vec<Category>> {
        let state = self.inner.lock().await;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: CategoryId) -> MarketplaceResult<Option<Category>> {
        let state = self.inner.lock().await;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, category: &Category) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(MarketplaceError::conflict("Category slug is already in use"));
        }
        state.categories.push(category.clone());
        Ok(())
    }
}

impl ServiceRepository for MemoryMarketplaceRepository {
    async fn insert_service_within_quota(
        &self,
        service: &Service,
        limit: Option<u32>,
    ) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        let subscription = state.subscription_mut(service.seller_id);
        if limit.is_some_and(|l| subscription.services_used >= l as i32) {
            return Ok(false);
        }
        subscription.services_used += 1;
        state.services.push(service.clone());
        Ok(true)
    }

    async fn find_service(&self, id: ServiceId) -> MarketplaceResult<Option<Service>> {
        let state = self.inner.lock().await;
        Ok(state.services.iter().find(|s| s.id == id).cloned())
    }

    async fn update_service(&self, service: &Service) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        let stored = state
            .services
            .iter_mut()
            .find(|s| s.id == service.id)
            .ok_or(MarketplaceError::NotFound("Service"))?;
        *stored = service.clone();
        Ok(())
    }

    async fn retire_service(&self, service: &Service) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        let stored = state
            .services
            .iter_mut()
            .find(|s| s.id == service.id)
            .ok_or(MarketplaceError::NotFound("Service"))?;
        *stored = service.clone();
        let subscription = state.subscription_mut(service.seller_id);
        subscription.services_used = (subscription.services_used - 1).max(0);
        Ok(())
    }

    async fn list_services(
        &self,
        query: &ServiceQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Service>> {
        let needle = query.search.as_deref().map(str::to_lowercase);
        let state = self.inner.lock().await;
        let matching: Vec<Service> = newest_first(&state.services, |s| s.created_at)
            .into_iter()
            .filter(|s| match s.status {
                ServiceStatus::Active => true,
                ServiceStatus::Paused => query.include_paused,
                ServiceStatus::Removed => false,
            })
            .filter(|s| query.category_id.is_none_or(|c| s.category_id == c))
            .filter(|s| query.seller_id.is_none_or(|u| s.seller_id == u))
            .filter(|s| {
                needle.as_deref().is_none_or(|n| {
                    s.title.to_lowercase().contains(n) || s.description.to_lowercase().contains(n)
                })
            })
            .collect();
        Ok(Page::from_vec(matching, page))
    }
}

impl ShortlistRepository for MemoryMarketplaceRepository {
    async fn add_to_shortlist(&self, user_id: UserId, service_id: ServiceId) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        if !state.shortlist.contains(&(user_id, service_id)) {
            state.shortlist.push((user_id, service_id));
        }
        Ok(())
    }

    async fn remove_from_shortlist(
        &self,
        user_id: UserId,
        service_id: ServiceId,
    ) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        let before = state.shortlist.len();
        state.shortlist.retain(|entry| *entry != (user_id, service_id));
        Ok(state.shortlist.len() < before)
    }

    async fn list_shortlist(&self, user_id: UserId) -> MarketplaceResult<Vec<Service>> {
        let state = self.inner.lock().await;
        Ok(state
            .shortlist
            .iter()
            .rev()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, id)| state.services.iter().find(|s| s.id == *id))
            .filter(|s| s.status != ServiceStatus::Removed)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Projects and Bids
// ============================================================================

impl ProjectRepository for MemoryMarketplaceRepository {
    async fn create_project(&self, project: &Project) -> MarketplaceResult<()> {
        self.inner.lock().await.projects.push(project.clone());
        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> MarketplaceResult<Option<Project>> {
        let state = self.inner.lock().await;
        Ok(state.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn update_project(&self, project: &Project) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        let stored = state
            .projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or(MarketplaceError::NotFound("Project"))?;
        *stored = project.clone();
        Ok(())
    }

    async fn list_projects(
        &self,
        query: &ProjectQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Project>> {
        let state = self.inner.lock().await;
        let matching: Vec<Project> = newest_first(&state.projects, |p| p.created_at)
            .into_iter()
            .filter(|p| query.status.is_none_or(|s| p.status == s))
            .filter(|p| query.category_id.is_none_or(|c| p.category_id == c))
            .filter(|p| query.client_id.is_none_or(|u| p.client_id == u))
            .collect();
        Ok(Page::from_vec(matching, page))
    }

    async fn award_bid(&self, project: &Project, bid: &Bid, order: &Order) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        let Some(stored) = state
            .projects
            .iter_mut()
            .find(|p| p.id == project.id && p.status == ProjectStatus::Open)
        else {
            return Ok(false);
        };
        stored.status = ProjectStatus::InProgress;
        stored.updated_at = Utc::now();

        for other in state.bids.iter_mut().filter(|b| b.project_id == project.id) {
            if other.id == bid.id {
                other.status = BidStatus::Accepted;
            } else if other.status == BidStatus::Pending {
                other.status = BidStatus::Rejected;
            }
        }
        state.orders.push(order.clone());
        Ok(true)
    }
}

impl BidRepository for MemoryMarketplaceRepository {
    async fn insert_bid_within_quota(&self, bid: &Bid, limit: Option<u32>) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        if state
            .bids
            .iter()
            .any(|b| b.project_id == bid.project_id && b.freelancer_id == bid.freelancer_id)
        {
            return Err(MarketplaceError::conflict("You have already bid on this project"));
        }
        let subscription = state.subscription_mut(bid.freelancer_id);
        if limit.is_some_and(|l| subscription.bids_used >= l as i32) {
            return Ok(false);
        }
        subscription.bids_used += 1;
        state.bids.push(bid.clone());
        Ok(true)
    }

    async fn find_bid(&self, id: BidId) -> MarketplaceResult<Option<Bid>> {
        let state = self.inner.lock().await;
        Ok(state.bids.iter().find(|b| b.id == id).cloned())
    }

    async fn update_bid(&self, bid: &Bid) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        let stored = state
            .bids
            .iter_mut()
            .find(|b| b.id == bid.id)
            .ok_or(MarketplaceError::NotFound("Bid"))?;
        *stored = bid.clone();
        Ok(())
    }

    async fn list_bids_for_project(&self, project_id: ProjectId) -> MarketplaceResult<Vec<Bid>> {
        let state = self.inner.lock().await;
        Ok(state
            .bids
            .iter()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_bids_by_freelancer(
        &self,
        freelancer_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Bid>> {
        let state = self.inner.lock().await;
        let mine: Vec<Bid> = newest_first(&state.bids, |b| b.created_at)
            .into_iter()
            .filter(|b| b.freelancer_id == freelancer_id)
            .collect();
        Ok(Page::from_vec(mine, page))
    }
}

// ============================================================================
// Orders
// ============================================================================

impl OrderRepository for MemoryMarketplaceRepository {
    async fn create_order(&self, order: &Order) -> MarketplaceResult<()> {
        self.inner.lock().await.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> MarketplaceResult<Option<Order>> {
        let state = self.inner.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn save_order(&self, order: &Order, expected: OrderStatus) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        match state
            .orders
            .iter_mut()
            .find(|o| o.id == order.id && o.status == expected)
        {
            Some(stored) => {
                *stored = order.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_orders(
        &self,
        user_id: UserId,
        role: OrderRole,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Order>> {
        let state = self.inner.lock().await;
        let orders: Vec<Order> = newest_first(&state.orders, |o| o.created_at)
            .into_iter()
            .filter(|o| match role {
                OrderRole::Buyer => o.buyer_id == user_id,
                OrderRole::Seller => o.seller_id == user_id,
                OrderRole::Any => o.is_party(user_id),
            })
            .collect();
        Ok(Page::from_vec(orders, page))
    }

    async fn add_milestone(&self, milestone: &Milestone) -> MarketplaceResult<()> {
        self.inner.lock().await.milestones.push(milestone.clone());
        Ok(())
    }

    async fn find_milestone(&self, id: MilestoneId) -> MarketplaceResult<Option<Milestone>> {
        let state = self.inner.lock().await;
        Ok(state.milestones.iter().find(|m| m.id == id).cloned())
    }

    async fn list_milestones(&self, order_id: OrderId) -> MarketplaceResult<Vec<Milestone>> {
        let state = self.inner.lock().await;
        Ok(state
            .milestones
            .iter()
            .filter(|m| m.order_id == order_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Communication
// ============================================================================

impl MessageRepository for MemoryMarketplaceRepository {
    async fn user_exists(&self, user_id: UserId) -> MarketplaceResult<bool> {
        Ok(self.inner.lock().await.users.contains(&user_id))
    }

    async fn insert_message(&self, message: &Message) -> MarketplaceResult<()> {
        self.inner.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Message>> {
        let state = self.inner.lock().await;
        let thread: Vec<Message> = newest_first(&state.messages, |m| m.created_at)
            .into_iter()
            .filter(|m| {
                (m.sender_id == user_id && m.recipient_id == other_id)
                    || (m.sender_id == other_id && m.recipient_id == user_id)
            })
            .collect();
        Ok(Page::from_vec(thread, page))
    }

    async fn mark_conversation_read(&self, user_id: UserId, other_id: UserId) -> MarketplaceResult<u64> {
        let mut state = self.inner.lock().await;
        let mut read = 0;
        for m in state
            .messages
            .iter_mut()
            .filter(|m| m.recipient_id == user_id && m.sender_id == other_id && !m.is_read)
        {
            m.is_read = true;
            read += 1;
        }
        Ok(read)
    }

    async fn inbox(&self, user_id: UserId) -> MarketplaceResult<Vec<Conversation>> {
        let state = self.inner.lock().await;
        let mut conversations: Vec<Conversation> = Vec::new();
        for m in newest_first(&state.messages, |m| m.created_at)
            .into_iter()
            .filter(|m| m.sender_id == user_id || m.recipient_id == user_id)
        {
            let counterpart_id = m.counterpart(user_id);
            let unread = i64::from(m.recipient_id == user_id && !m.is_read);
            match conversations
                .iter_mut()
                .find(|c| c.counterpart_id == counterpart_id)
            {
                Some(c) => c.unread_count += unread,
                None => conversations.push(Conversation {
                    counterpart_id,
                    last_message: m,
                    unread_count: unread,
                }),
            }
        }
        Ok(conversations)
    }
}

impl NotificationRepository for MemoryMarketplaceRepository {
    async fn insert_notification(&self, notification: &Notification) -> MarketplaceResult<()> {
        self.inner.lock().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Notification>> {
        let state = self.inner.lock().await;
        let mine: Vec<Notification> = newest_first(&state.notifications, |n| n.created_at)
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect();
        Ok(Page::from_vec(mine, page))
    }

    async fn count_unread_notifications(&self, user_id: UserId) -> MarketplaceResult<i64> {
        let state = self.inner.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> MarketplaceResult<bool> {
        let mut state = self.inner.lock().await;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> MarketplaceResult<u64> {
        let mut state = self.inner.lock().await;
        let mut marked = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            marked += 1;
        }
        Ok(marked)
    }
}

impl OutsourcingRepository for MemoryMarketplaceRepository {
    async fn create_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()> {
        self.inner.lock().await.outsourcing.push(request.clone());
        Ok(())
    }

    async fn find_outsourcing_request(
        &self,
        id: OutsourcingRequestId,
    ) -> MarketplaceResult<Option<OutsourcingRequest>> {
        let state = self.inner.lock().await;
        Ok(state.outsourcing.iter().find(|r| r.id == id).cloned())
    }

    async fn update_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()> {
        let mut state = self.inner.lock().await;
        let stored = state
            .outsourcing
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or(MarketplaceError::NotFound("Outsourcing request"))?;
        *stored = request.clone();
        Ok(())
    }

    async fn list_outsourcing_requests(
        &self,
        requester_id: Option<UserId>,
        status: Option<OutsourcingStatus>,
        page: PageRequest,
    ) -> MarketplaceResult<Page<OutsourcingRequest>> {
        let state = self.inner.lock().await;
        let matching: Vec<OutsourcingRequest> = newest_first(&state.outsourcing, |r| r.created_at)
            .into_iter()
            .filter(|r| requester_id.is_none_or(|u| r.requester_id == u))
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect();
        Ok(Page::from_vec(matching, page))
    }
}

// ============================================================================
// Billing
// ============================================================================

impl SubscriptionRepository for MemoryMarketplaceRepository {
    async fn find_subscription(&self, user_id: UserId) -> MarketplaceResult<Option<Subscription>> {
        let state = self.inner.lock().await;
        Ok(state.subscriptions.get(&user_id).cloned())
    }
}

impl LedgerRepository for MemoryMarketplaceRepository {
    async fn record_subscription_payment(
        &self,
        entry: &LedgerEntry,
        renewal: &Renewal,
    ) -> MarketplaceResult<LedgerWrite> {
        let mut state = self.inner.lock().await;
        if state.is_recorded(entry) {
            return Ok(LedgerWrite::Duplicate);
        }
        state.ledger.push(entry.clone());
        state.subscription_mut(renewal.user_id).apply_renewal(renewal);
        Ok(LedgerWrite::Applied)
    }

    async fn record_escrow_funding(
        &self,
        entry: &LedgerEntry,
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    ) -> MarketplaceResult<EscrowWrite> {
        let mut state = self.inner.lock().await;
        if state.is_recorded(entry) {
            return Ok(EscrowWrite::Duplicate);
        }
        state.ledger.push(entry.clone());

        let mut order_started = false;
        if let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::AwaitingPayment)
        {
            order.status = OrderStatus::InProgress;
            order.updated_at = entry.created_at;
            order_started = true;
        }
        if let Some(milestone) = milestone_id.and_then(|id| {
            state
                .milestones
                .iter_mut()
                .find(|m| m.id == id && m.order_id == order_id && m.status == MilestoneStatus::Pending)
        }) {
            milestone.status = MilestoneStatus::Funded;
            milestone.funded_at = Some(entry.created_at);
        }

        Ok(EscrowWrite::Applied { order_started })
    }

    async fn list_ledger(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<LedgerEntry>> {
        let state = self.inner.lock().await;
        let mine: Vec<LedgerEntry> = newest_first(&state.ledger, |e| e.created_at)
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        Ok(Page::from_vec(mine, page))
    }
}

impl StatsRepository for MemoryMarketplaceRepository {
    async fn platform_stats(&self) -> MarketplaceResult<PlatformStats> {
        let state = self.inner.lock().await;
        let orders_with = |status: OrderStatus| {
            state.orders.iter().filter(|o| o.status == status).count() as i64
        };
        let revenue = |kind: TransactionKind| -> i64 {
            state
                .ledger
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.amount.value())
                .sum()
        };

        Ok(PlatformStats {
            users: state.users.len() as i64,
            suspended_users: 0,
            active_services: state
                .services
                .iter()
                .filter(|s| s.status == ServiceStatus::Active)
                .count() as i64,
            open_projects: state
                .projects
                .iter()
                .filter(|p| p.status == ProjectStatus::Open)
                .count() as i64,
            orders_in_progress: orders_with(OrderStatus::InProgress),
            disputed_orders: orders_with(OrderStatus::Disputed),
            completed_orders: orders_with(OrderStatus::Completed),
            pending_outsourcing_requests: state
                .outsourcing
                .iter()
                .filter(|r| r.status == OutsourcingStatus::Pending)
                .count() as i64,
            escrow_funded_cents: revenue(TransactionKind::EscrowFund),
            subscription_revenue_cents: revenue(TransactionKind::Subscription),
        })
    }
}
