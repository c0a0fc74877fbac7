//! Wishlist handlers. Like carts, a user's wishlist is created lazily on
//! first access; adds are idempotent.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::http::Envelope;
use crate::models::wishlist::{Wishlist, WishlistItemJoined, WishlistView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Serialize)]
pub struct WishlistBody {
    pub wishlist: WishlistView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsBody {
    pub in_wishlist: bool,
}

async fn load_or_create_wishlist(db: &sqlx::PgPool, user_id: Uuid) -> Result<Wishlist, ApiError> {
    sqlx::query(
        "INSERT INTO wishlists (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .execute(db)
    .await?;
    let wishlist = sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(wishlist)
}

async fn wishlist_response(
    db: &sqlx::PgPool,
    user_id: Uuid,
    message: Option<&str>,
) -> Result<Json<Envelope<WishlistBody>>, ApiError> {
    let wishlist = load_or_create_wishlist(db, user_id).await?;
    let items = sqlx::query_as::<_, WishlistItemJoined>(
        "SELECT wi.added_at, p.id AS product_id, p.name AS product_name, \
         p.image AS product_image, p.price AS product_price, \
         p.discount_price AS product_discount_price, p.stock AS product_stock \
         FROM wishlist_items wi JOIN products p ON p.id = wi.product_id \
         WHERE wi.wishlist_id = $1 ORDER BY wi.added_at DESC",
    )
    .bind(wishlist.id)
    .fetch_all(db)
    .await?;

    let body = WishlistBody { wishlist: WishlistView::assemble(wishlist, items) };
    Ok(Json(match message {
        Some(m) => Envelope::with_message(m, body),
        None => Envelope::ok(body),
    }))
}

pub async fn get_wishlist(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<WishlistBody>>, ApiError> {
    wishlist_response(&s.db, auth.id, None).await
}

pub async fn add_to_wishlist(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<AddToWishlistRequest>,
) -> Result<Json<Envelope<WishlistBody>>, ApiError> {
    let product_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE id = $1 AND is_active = TRUE",
    )
    .bind(r.product_id)
    .fetch_one(&s.db)
    .await?;
    if product_exists == 0 {
        return Err(ApiError::NotFound("Product"));
    }

    let wishlist = load_or_create_wishlist(&s.db, auth.id).await?;
    sqlx::query(
        "INSERT INTO wishlist_items (id, wishlist_id, product_id) VALUES ($1, $2, $3) \
         ON CONFLICT (wishlist_id, product_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(wishlist.id)
    .bind(r.product_id)
    .execute(&s.db)
    .await?;

    wishlist_response(&s.db, auth.id, Some("Product added to wishlist")).await
}

pub async fn remove_from_wishlist(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<WishlistBody>>, ApiError> {
    let wishlist = sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE user_id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Wishlist"))?;

    let removed =
        sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = $1 AND product_id = $2")
            .bind(wishlist.id)
            .bind(product_id)
            .execute(&s.db)
            .await?;
    if removed.rows_affected() == 0 {
        return Err(ApiError::NotFound("Item"));
    }

    wishlist_response(&s.db, auth.id, Some("Product removed from wishlist")).await
}

pub async fn clear_wishlist(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<WishlistBody>>, ApiError> {
    let wishlist = load_or_create_wishlist(&s.db, auth.id).await?;
    sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = $1")
        .bind(wishlist.id)
        .execute(&s.db)
        .await?;

    wishlist_response(&s.db, auth.id, Some("Wishlist cleared")).await
}

pub async fn contains_product(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<ContainsBody>>, ApiError> {
    let in_wishlist = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM wishlist_items wi JOIN wishlists w ON w.id = wi.wishlist_id \
         WHERE w.user_id = $1 AND wi.product_id = $2",
    )
    .bind(auth.id)
    .bind(product_id)
    .fetch_one(&s.db)
    .await?
        > 0;

    Ok(Json(Envelope::ok(ContainsBody { in_wishlist })))
}
