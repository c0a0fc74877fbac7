//! External collaborators: payment charging and outbound email.

pub mod email;
pub mod payment;

pub use email::{Mailer, StubMailer};
pub use payment::{ChargeReceipt, PaymentGateway, StubPaymentGateway};

use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum GatewayError {
    #[error("Payment failed: {0}")]
    Declined(String),
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}
