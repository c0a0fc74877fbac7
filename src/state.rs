//! Shared application state handed to every handler.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::AuthKeys;
use crate::gateways::{Mailer, PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub auth: Arc<AuthKeys>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Publish a domain event when a NATS client is configured. Publish
    /// failures are logged, never surfaced to the request.
    pub async fn publish(&self, subject: &str, payload: &impl Serialize) {
        let Some(client) = &self.nats else { return };
        match serde_json::to_vec(payload) {
            Ok(bytes) => {
                if let Err(e) = client.publish(subject.to_string(), bytes.into()).await {
                    tracing::warn!(subject, error = %e, "event publish failed");
                }
            }
            Err(e) => tracing::warn!(subject, error = %e, "event serialization failed"),
        }
    }
}
