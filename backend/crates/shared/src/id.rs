//! Typed entity identifiers.
//!
//! An `OrderId` and a `UserId` are both UUIDs on the wire and in the
//! database, but they cannot be swapped by accident in Rust.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// UUID tagged with the entity it identifies.
///
/// ```
/// use kernel::id::{Id, markers};
/// type UserId = Id<markers::User>;
/// let id = UserId::new();
/// assert_eq!(id.as_uuid().get_version_num(), 4);
/// ```
pub struct Id<T> {
    value: Uuid,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Random v4 id.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            value: uuid,
            _marker: PhantomData,
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    pub fn into_uuid(self) -> Uuid {
        self.value
    }
}

// Manual impls so markers need no derives.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self::from_uuid)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

pub mod markers {
    pub struct User;
    pub struct Category;
    pub struct Service;
    pub struct Project;
    pub struct Bid;
    pub struct Order;
    pub struct Milestone;
    pub struct Message;
    pub struct Notification;
    pub struct OutsourcingRequest;
    pub struct Transaction;
    pub struct Subscription;
}

pub type UserId = Id<markers::User>;
pub type CategoryId = Id<markers::Category>;
pub type ServiceId = Id<markers::Service>;
pub type ProjectId = Id<markers::Project>;
pub type BidId = Id<markers::Bid>;
pub type OrderId = Id<markers::Order>;
pub type MilestoneId = Id<markers::Milestone>;
pub type MessageId = Id<markers::Message>;
pub type NotificationId = Id<markers::Notification>;
pub type OutsourcingRequestId = Id<markers::OutsourcingRequest>;
pub type TransactionId = Id<markers::Transaction>;
pub type SubscriptionId = Id<markers::Subscription>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uuid_roundtrips() {
        let uuid = Uuid::new_v4();
        let id: OrderId = Id::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn parses_from_str() {
        let id: UserId = "6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11".parse().unwrap();
        assert_eq!(id.to_string(), "6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11");
        assert!("ORD-123".parse::<UserId>().is_err());
    }

    #[test]
    fn serializes_as_plain_uuid() {
        let id: MilestoneId = "6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11\"");
        let back: MilestoneId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
