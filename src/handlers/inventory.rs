//! Inventory ledger handlers. The ledger row is authoritative;
//! `products.stock` is refreshed in the same transaction as every write.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::domain::events::ProductEvent;
use crate::domain::ledger::Movement;
use crate::error::ApiError;
use crate::http::{Envelope, PageParams, Pagination};
use crate::models::inventory::{Inventory, InventoryListed, InventoryMovement};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustInventoryRequest {
    #[serde(rename = "type")]
    pub movement: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReservationRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct InventoryBody {
    pub inventory: Inventory,
}

#[derive(Serialize)]
pub struct InventoryListBody {
    pub inventory: Vec<InventoryListed>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockBody {
    pub low_stock_products: Vec<InventoryListed>,
}

#[derive(Serialize)]
pub struct HistoryBody {
    pub history: Vec<InventoryMovement>,
}

pub async fn list_inventory(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(pager): Query<PageParams>,
) -> Result<Json<Envelope<InventoryListBody>>, ApiError> {
    let inventory = sqlx::query_as::<_, InventoryListed>(
        "SELECT i.id, i.product_id, p.name AS product_name, i.quantity, i.reserved, \
         i.available, i.reorder_level, i.last_restocked \
         FROM inventory i JOIN products p ON p.id = i.product_id \
         ORDER BY i.created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(pager.limit())
    .bind(pager.offset())
    .fetch_all(&s.db)
    .await?;
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM inventory").fetch_one(&s.db).await?;

    Ok(Json(Envelope::paginated(
        InventoryListBody { inventory },
        Pagination::new(total, pager.page(), pager.limit()),
    )))
}

pub async fn get_product_inventory(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<InventoryBody>>, ApiError> {
    let inventory =
        sqlx::query_as::<_, Inventory>("SELECT * FROM inventory WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("Inventory"))?;
    Ok(Json(Envelope::ok(InventoryBody { inventory })))
}

pub async fn adjust_inventory(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<AdjustInventoryRequest>,
) -> Result<Json<Envelope<InventoryBody>>, ApiError> {
    r.validate()?;
    let movement = Movement::parse(&r.movement)
        .ok_or_else(|| ApiError::Validation(format!("Unknown movement type: {}", r.movement)))?;

    let product_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&s.db)
            .await?;
    if product_exists == 0 {
        return Err(ApiError::NotFound("Product"));
    }

    let mut tx = s.db.begin().await?;
    // Ledger rows are created lazily on first movement.
    sqlx::query(
        "INSERT INTO inventory (id, product_id) VALUES ($1, $2) \
         ON CONFLICT (product_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    let inventory = if movement.adds_stock() {
        sqlx::query_as::<_, Inventory>(
            "UPDATE inventory SET quantity = quantity + $2, \
             available = quantity + $2 - reserved, \
             last_restocked = CASE WHEN $3 = 'purchase' THEN NOW() ELSE last_restocked END, \
             updated_at = NOW() WHERE product_id = $1 RETURNING *",
        )
        .bind(product_id)
        .bind(r.quantity)
        .bind(movement.as_str())
        .fetch_optional(&mut *tx)
        .await?
    } else {
        // Subtractive movements may not dip into reserved stock.
        sqlx::query_as::<_, Inventory>(
            "UPDATE inventory SET quantity = quantity - $2, \
             available = quantity - $2 - reserved, updated_at = NOW() \
             WHERE product_id = $1 AND quantity - reserved >= $2 RETURNING *",
        )
        .bind(product_id)
        .bind(r.quantity)
        .fetch_optional(&mut *tx)
        .await?
    };
    let Some(inventory) = inventory else {
        return Err(ApiError::BusinessRule("Insufficient stock".into()));
    };

    sqlx::query(
        "INSERT INTO inventory_history (id, product_id, movement, quantity, reason, reference) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(movement.as_str())
    .bind(r.quantity)
    .bind(r.reason.as_deref().unwrap_or(""))
    .bind(r.reference.as_deref().unwrap_or(""))
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(inventory.quantity)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let event = ProductEvent::StockChanged { product_id, stock: inventory.quantity };
    s.publish(event.subject(), &event).await;

    Ok(Json(Envelope::with_message("Inventory updated successfully", InventoryBody { inventory })))
}

pub async fn get_low_stock(
    State(s): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Envelope<LowStockBody>>, ApiError> {
    let low_stock_products = sqlx::query_as::<_, InventoryListed>(
        "SELECT i.id, i.product_id, p.name AS product_name, i.quantity, i.reserved, \
         i.available, i.reorder_level, i.last_restocked \
         FROM inventory i JOIN products p ON p.id = i.product_id \
         WHERE i.available <= i.reorder_level ORDER BY i.available ASC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(Envelope::ok(LowStockBody { low_stock_products })))
}

pub async fn get_inventory_history(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<Uuid>,
    Query(p): Query<HistoryParams>,
) -> Result<Json<Envelope<HistoryBody>>, ApiError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&s.db)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Inventory"));
    }

    let history = sqlx::query_as::<_, InventoryMovement>(
        "SELECT * FROM inventory_history WHERE product_id = $1 \
         ORDER BY created_at DESC LIMIT $2",
    )
    .bind(product_id)
    .bind(p.limit.unwrap_or(20).clamp(1, 100))
    .fetch_all(&s.db)
    .await?;
    Ok(Json(Envelope::ok(HistoryBody { history })))
}

pub async fn reserve_stock(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<ReservationRequest>,
) -> Result<Json<Envelope<InventoryBody>>, ApiError> {
    r.validate()?;
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&s.db)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Inventory"));
    }

    let inventory = sqlx::query_as::<_, Inventory>(
        "UPDATE inventory SET reserved = reserved + $2, \
         available = quantity - reserved - $2, updated_at = NOW() \
         WHERE product_id = $1 AND quantity - reserved >= $2 RETURNING *",
    )
    .bind(product_id)
    .bind(r.quantity)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::BusinessRule("Insufficient available stock".into()))?;

    Ok(Json(Envelope::with_message("Stock reserved successfully", InventoryBody { inventory })))
}

pub async fn release_reserved_stock(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<ReservationRequest>,
) -> Result<Json<Envelope<InventoryBody>>, ApiError> {
    r.validate()?;
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&s.db)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Inventory"));
    }

    let inventory = sqlx::query_as::<_, Inventory>(
        "UPDATE inventory SET reserved = reserved - $2, \
         available = quantity - reserved + $2, updated_at = NOW() \
         WHERE product_id = $1 AND reserved >= $2 RETURNING *",
    )
    .bind(product_id)
    .bind(r.quantity)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::BusinessRule("Cannot release more than reserved".into()))?;

    Ok(Json(Envelope::with_message(
        "Reserved stock released successfully",
        InventoryBody { inventory },
    )))
}
