use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub reserved: i32,
    pub available: i32,
    pub reorder_level: i32,
    pub reorder_quantity: i32,
    pub last_restocked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable ledger entry.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub movement: String,
    pub quantity: i32,
    pub reason: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

/// Inventory row joined with its product name for admin listings.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryListed {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub reserved: i32,
    pub available: i32,
    pub reorder_level: i32,
    pub last_restocked: Option<DateTime<Utc>>,
}
