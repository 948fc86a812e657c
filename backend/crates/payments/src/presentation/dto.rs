//! Request and response bodies

use kernel::id::{MilestoneId, OrderId};
use marketplace::models::Plan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub milestone_id: Option<MilestoneId>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub redirect_url: String,
    pub reference: String,
}

/// Ozow's acknowledgment body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
}
