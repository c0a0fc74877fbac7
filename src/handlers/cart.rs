//! Cart handlers. Totals are recomputed and persisted on every mutation;
//! line prices are frozen at the product's effective price at add time.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::pricing::cart_totals;
use crate::error::ApiError;
use crate::http::Envelope;
use crate::models::cart::{Cart, CartItemJoined, CartView};
use crate::models::product::Product;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct CartBody {
    pub cart: CartView,
}

/// Carts are created lazily on first access.
async fn load_or_create_cart(db: &sqlx::PgPool, user_id: Uuid) -> Result<Cart, ApiError> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .execute(db)
        .await?;
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(cart)
}

async fn fetch_items(db: &sqlx::PgPool, cart_id: Uuid) -> Result<Vec<CartItemJoined>, ApiError> {
    let items = sqlx::query_as::<_, CartItemJoined>(
        "SELECT ci.quantity, ci.price, p.id AS product_id, p.name AS product_name, \
         p.image AS product_image, p.price AS product_price, \
         p.discount_price AS product_discount_price, p.stock AS product_stock \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 ORDER BY ci.id",
    )
    .bind(cart_id)
    .fetch_all(db)
    .await?;
    Ok(items)
}

/// Recompute and persist subtotal/tax/total from the stored lines.
async fn persist_totals(
    tx: &mut sqlx::PgConnection,
    cart_id: Uuid,
) -> Result<(), ApiError> {
    let lines = sqlx::query_as::<_, (Decimal, i32)>(
        "SELECT price, quantity FROM cart_items WHERE cart_id = $1",
    )
    .bind(cart_id)
    .fetch_all(&mut *tx)
    .await?;
    let totals = cart_totals(&lines);
    sqlx::query(
        "UPDATE carts SET subtotal = $2, tax = $3, total = $4, updated_at = NOW() WHERE id = $1",
    )
    .bind(cart_id)
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.total)
    .execute(tx)
    .await?;
    Ok(())
}

async fn cart_response(
    db: &sqlx::PgPool,
    user_id: Uuid,
    message: Option<&str>,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    let cart = load_or_create_cart(db, user_id).await?;
    let items = fetch_items(db, cart.id).await?;
    let body = CartBody { cart: CartView::assemble(cart, items) };
    Ok(Json(match message {
        Some(m) => Envelope::with_message(m, body),
        None => Envelope::ok(body),
    }))
}

pub async fn get_cart(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    cart_response(&s.db, auth.id, None).await
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<AddToCartRequest>,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    r.validate()?;

    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND is_active = TRUE",
    )
    .bind(r.product_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Product"))?;

    if product.stock < r.quantity {
        return Err(ApiError::BusinessRule("Insufficient stock".into()));
    }

    let cart = load_or_create_cart(&s.db, auth.id).await?;

    let mut tx = s.db.begin().await?;
    // Existing lines merge by incrementing quantity; the frozen add-time
    // price is left untouched.
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity, price) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (cart_id, product_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(Uuid::now_v7())
    .bind(cart.id)
    .bind(product.id)
    .bind(r.quantity)
    .bind(product.effective_price())
    .execute(&mut *tx)
    .await?;
    persist_totals(&mut tx, cart.id).await?;
    tx.commit().await?;

    cart_response(&s.db, auth.id, Some("Product added to cart")).await
}

pub async fn update_cart_item(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<UpdateCartItemRequest>,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Cart"))?;

    let mut tx = s.db.begin().await?;
    let updated = if r.quantity <= 0 {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(r.product_id)
            .execute(&mut *tx)
            .await?
    } else {
        sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart.id)
        .bind(r.product_id)
        .bind(r.quantity)
        .execute(&mut *tx)
        .await?
    };
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("Item"));
    }
    persist_totals(&mut tx, cart.id).await?;
    tx.commit().await?;

    cart_response(&s.db, auth.id, Some("Cart updated")).await
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Cart"))?;

    let mut tx = s.db.begin().await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart.id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    persist_totals(&mut tx, cart.id).await?;
    tx.commit().await?;

    cart_response(&s.db, auth.id, Some("Item removed from cart")).await
}

pub async fn clear_cart(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<CartBody>>, ApiError> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Cart"))?;

    let mut tx = s.db.begin().await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart.id).execute(&mut *tx).await?;
    persist_totals(&mut tx, cart.id).await?;
    tx.commit().await?;

    cart_response(&s.db, auth.id, Some("Cart cleared")).await
}
