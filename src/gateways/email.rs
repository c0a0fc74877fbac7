use async_trait::async_trait;
use serde_json::Value;

use super::GatewayError;

/// Outbound email seam: a named template plus a JSON context.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, template: &str, recipient: &str, context: &Value)
        -> Result<(), GatewayError>;
}

/// Development mailer that only logs the delivery.
pub struct StubMailer;

#[async_trait]
impl Mailer for StubMailer {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        _context: &Value,
    ) -> Result<(), GatewayError> {
        tracing::info!(template, recipient, "stub email delivered");
        Ok(())
    }
}
