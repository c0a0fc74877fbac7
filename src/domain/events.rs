//! Domain events published to NATS when a client is configured.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Uuid, total: Decimal },
    Paid { order_id: Uuid, transaction_id: String },
    StatusChanged { order_id: Uuid, status: String },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Created { .. } => "storefront.orders.created",
            Self::Paid { .. } => "storefront.orders.paid",
            Self::StatusChanged { .. } => "storefront.orders.status",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, name: String },
    StockChanged { product_id: Uuid, stock: i32 },
}

impl ProductEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Created { .. } => "storefront.products.created",
            Self::StockChanged { .. } => "storefront.products.stock",
        }
    }
}
