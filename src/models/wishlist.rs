use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::product::ProductSummary;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Wishlist entry joined with its product.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct WishlistItemJoined {
    pub added_at: DateTime<Utc>,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub product_price: Decimal,
    pub product_discount_price: Option<Decimal>,
    pub product_stock: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemView {
    pub product: ProductSummary,
    pub added_at: DateTime<Utc>,
}

impl From<WishlistItemJoined> for WishlistItemView {
    fn from(row: WishlistItemJoined) -> Self {
        Self {
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
                image: row.product_image,
                price: row.product_price,
                discount_price: row.product_discount_price,
                stock: row.product_stock,
            },
            added_at: row.added_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub id: Uuid,
    pub items: Vec<WishlistItemView>,
}

impl WishlistView {
    pub fn assemble(wishlist: Wishlist, items: Vec<WishlistItemJoined>) -> Self {
        Self {
            id: wishlist.id,
            items: items.into_iter().map(WishlistItemView::from).collect(),
        }
    }
}
