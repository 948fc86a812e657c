//! Entity Module

pub mod bid;
pub mod category;
pub mod message;
pub mod notification;
pub mod order;
pub mod outsourcing;
pub mod project;
pub mod service;
pub mod subscription;
pub mod transaction;

pub use bid::{Bid, BidStatus};
pub use category::Category;
pub use message::{Conversation, Message};
pub use notification::Notification;
pub use order::{DisputeOutcome, Milestone, MilestoneStatus, Order, OrderOrigin, OrderStatus};
pub use outsourcing::{OutsourcingRequest, OutsourcingStatus};
pub use project::{Project, ProjectDraft, ProjectStatus};
pub use service::{Service, ServiceDraft, ServiceStatus};
pub use subscription::{Plan, PlanLimits, Renewal, Subscription, SubscriptionStatus};
pub use transaction::{LedgerEntry, LedgerStatus, PaymentProvider, TransactionKind};
