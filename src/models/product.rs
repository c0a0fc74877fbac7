use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::money::effective_price;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: String,
    pub image: String,
    pub images: Vec<String>,
    pub stock: i32,
    pub rating: Decimal,
    pub num_reviews: i32,
    pub sku: Option<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Discount price when set, list price otherwise.
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.discount_price)
    }
}

/// Compact product shape embedded in cart, wishlist and analytics payloads.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i32,
}
