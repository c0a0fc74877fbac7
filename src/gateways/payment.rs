use async_trait::async_trait;

use super::GatewayError;

/// Successful charge, identified by the processor's transaction id.
#[derive(Clone, Debug)]
pub struct ChargeReceipt {
    pub transaction_id: String,
}

/// Payment processor seam. Amounts are in minor units (cents).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount_minor: i64,
        token: &str,
        description: &str,
    ) -> Result<ChargeReceipt, GatewayError>;
}

/// Development gateway: accepts everything except an empty token.
pub struct StubPaymentGateway;

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn charge(
        &self,
        amount_minor: i64,
        token: &str,
        description: &str,
    ) -> Result<ChargeReceipt, GatewayError> {
        if token.is_empty() {
            return Err(GatewayError::Declined("missing payment token".into()));
        }
        let transaction_id = format!("txn_{:08x}", rand::random::<u32>());
        tracing::info!(amount_minor, description, transaction_id, "stub charge accepted");
        Ok(ChargeReceipt { transaction_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_charges_with_token() {
        let receipt = StubPaymentGateway.charge(1999, "tok_visa", "Order X").await.unwrap();
        assert!(receipt.transaction_id.starts_with("txn_"));
    }

    #[tokio::test]
    async fn stub_declines_empty_token() {
        assert!(StubPaymentGateway.charge(1999, "", "Order X").await.is_err());
    }
}
