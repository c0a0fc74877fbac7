use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::product::ProductSummary;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line as stored: price frozen at the effective price at add time.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

/// Cart line joined with its product. Column aliases keep the line price and
/// the product's live price apart.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartItemJoined {
    pub quantity: i32,
    pub price: Decimal,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub product_price: Decimal,
    pub product_discount_price: Option<Decimal>,
    pub product_stock: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product: ProductSummary,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<CartItemJoined> for CartItemView {
    fn from(row: CartItemJoined) -> Self {
        Self {
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
                image: row.product_image,
                price: row.product_price,
                discount_price: row.product_discount_price,
                stock: row.product_stock,
            },
            quantity: row.quantity,
            price: row.price,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    pub fn assemble(cart: Cart, items: Vec<CartItemJoined>) -> Self {
        Self {
            id: cart.id,
            items: items.into_iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal,
            tax: cart.tax,
            total: cart.total,
            updated_at: cart.updated_at,
        }
    }
}
