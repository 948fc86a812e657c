//! Webhook Handling
//!
//! Verify, parse, settle. Only an authenticity failure is reported back to
//! the gateway; everything after verification is acknowledged so the
//! gateway stops retrying, and problems are logged instead.

use std::sync::Arc;

use marketplace::models::PaymentProvider;

use crate::application::settle::{SettlePaymentUseCase, Settlement};
use crate::domain::PaymentStore;
use crate::domain::gateway::WebhookContext;
use crate::domain::notification::WebhookPayload;
use crate::infra::Gateways;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Failed verification; answered with 400
    Rejected(String),
    /// Answered with the gateway's success token. `None` when the payload
    /// could not be parsed or settlement failed.
    Acknowledged(Option<Settlement>),
}

pub struct HandleWebhookUseCase<R>
where
    R: PaymentStore,
{
    repo: Arc<R>,
    gateways: Arc<Gateways>,
}

impl<R> HandleWebhookUseCase<R>
where
    R: PaymentStore,
{
    pub fn new(repo: Arc<R>, gateways: Arc<Gateways>) -> Self {
        Self { repo, gateways }
    }

    pub async fn execute(
        &self,
        provider: PaymentProvider,
        payload: &WebhookPayload,
        context: &WebhookContext,
    ) -> WebhookOutcome {
        let verification = self
            .gateways
            .verify_webhook(provider, payload, context)
            .await;
        if !verification.valid {
            let reason = verification
                .reason
                .unwrap_or_else(|| "verification failed".to_string());
            tracing::warn!(
                provider = %provider,
                source_ip = ?context.source_ip,
                reason = %reason,
                "Webhook rejected"
            );
            return WebhookOutcome::Rejected(reason);
        }

        let notification = match self.gateways.parse_webhook(provider, payload) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Verified webhook could not be parsed");
                return WebhookOutcome::Acknowledged(None);
            }
        };

        match SettlePaymentUseCase::new(self.repo.clone())
            .execute(&notification)
            .await
        {
            Ok(settlement) => {
                tracing::info!(
                    provider = %provider,
                    reference = %notification.reference,
                    status = %notification.status,
                    settlement = ?settlement,
                    "Webhook settled"
                );
                WebhookOutcome::Acknowledged(Some(settlement))
            }
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    reference = %notification.reference,
                    error = %e,
                    "Webhook settlement failed"
                );
                WebhookOutcome::Acknowledged(None)
            }
        }
    }
}
