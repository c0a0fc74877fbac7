//! Product review handlers. The product's denormalized rating and review
//! count are recomputed from the reviews table inside the same transaction
//! as every review write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthUser, ROLE_ADMIN};
use crate::error::ApiError;
use crate::http::{Empty, Envelope, PageParams, Pagination};
use crate::models::review::{Review, ReviewListed};
use crate::state::AppState;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Newest,
    Helpful,
    RatingHigh,
    RatingLow,
}

impl ReviewSort {
    fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "r.created_at DESC",
            Self::Helpful => "r.helpful DESC",
            Self::RatingHigh => "r.rating DESC",
            Self::RatingLow => "r.rating ASC",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub sort: Option<ReviewSort>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewBody {
    pub review: Review,
}

#[derive(Serialize)]
pub struct ReviewsBody {
    pub reviews: Vec<ReviewListed>,
}

/// Refresh the product's denormalized rating from the reviews table.
/// A product with no remaining reviews resets to zero.
async fn recompute_rating(tx: &mut sqlx::PgConnection, product_id: Uuid) -> Result<(), ApiError> {
    let (rating, count) = sqlx::query_as::<_, (Decimal, i64)>(
        "SELECT COALESCE(ROUND(AVG(rating), 2), 0), COUNT(*) FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE products SET rating = $2, num_reviews = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .bind(rating)
    .bind(count as i32)
    .execute(tx)
    .await?;
    Ok(())
}

pub async fn list_product_reviews(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(p): Query<ReviewListParams>,
) -> Result<Json<Envelope<ReviewsBody>>, ApiError> {
    let pager = PageParams { page: p.page, limit: p.limit };
    let order = p.sort.unwrap_or_default().order_by();

    let reviews = sqlx::query_as::<_, ReviewListed>(&format!(
        "SELECT r.id, r.product_id, r.user_id, u.name AS user_name, r.rating, r.title, \
         r.comment, r.verified, r.helpful, r.unhelpful, r.created_at \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE r.product_id = $1 ORDER BY {order} LIMIT $2 OFFSET $3",
    ))
    .bind(product_id)
    .bind(pager.limit())
    .bind(pager.offset())
    .fetch_all(&s.db)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(&s.db)
        .await?;

    Ok(Json(Envelope::paginated(
        ReviewsBody { reviews },
        Pagination::new(total, pager.page(), pager.limit()),
    )))
}

pub async fn create_review(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Envelope<ReviewBody>>), ApiError> {
    r.validate()?;

    let product_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&s.db)
            .await?;
    if product_exists == 0 {
        return Err(ApiError::NotFound("Product"));
    }

    let already = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND user_id = $2",
    )
    .bind(product_id)
    .bind(auth.id)
    .fetch_one(&s.db)
    .await?;
    if already > 0 {
        return Err(ApiError::Conflict("You have already reviewed this product".into()));
    }

    // Mark the review as a verified purchase when the author has a delivered
    // or paid order containing this product.
    let verified = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE o.user_id = $1 AND oi.product_id = $2 AND o.payment_status = 'completed'",
    )
    .bind(auth.id)
    .bind(product_id)
    .fetch_one(&s.db)
    .await?
        > 0;

    let mut tx = s.db.begin().await?;
    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, product_id, user_id, rating, title, comment, verified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(auth.id)
    .bind(r.rating)
    .bind(&r.title)
    .bind(&r.comment)
    .bind(verified)
    .fetch_one(&mut *tx)
    .await?;
    recompute_rating(&mut tx, product_id).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Review added successfully", ReviewBody { review })),
    ))
}

pub async fn update_review(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateReviewRequest>,
) -> Result<Json<Envelope<ReviewBody>>, ApiError> {
    r.validate()?;

    let mut tx = s.db.begin().await?;
    let review = sqlx::query_as::<_, Review>(
        "UPDATE reviews SET rating = COALESCE($3, rating), title = COALESCE($4, title), \
         comment = COALESCE($5, comment), updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(auth.id)
    .bind(r.rating)
    .bind(&r.title)
    .bind(&r.comment)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("Review"))?;
    recompute_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    Ok(Json(Envelope::with_message("Review updated successfully", ReviewBody { review })))
}

pub async fn delete_review(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Review"))?;
    if review.user_id != auth.id && auth.role != ROLE_ADMIN {
        return Err(ApiError::Forbidden("You can only delete your own reviews".into()));
    }

    let mut tx = s.db.begin().await?;
    sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&mut *tx).await?;
    recompute_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    Ok(Json(Envelope::with_message("Review deleted successfully", Empty {})))
}

pub async fn mark_helpful(
    State(s): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ReviewBody>>, ApiError> {
    let review = sqlx::query_as::<_, Review>(
        "UPDATE reviews SET helpful = helpful + 1, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Review"))?;
    Ok(Json(Envelope::ok(ReviewBody { review })))
}

pub async fn mark_unhelpful(
    State(s): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ReviewBody>>, ApiError> {
    let review = sqlx::query_as::<_, Review>(
        "UPDATE reviews SET unhelpful = unhelpful + 1, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Review"))?;
    Ok(Json(Envelope::ok(ReviewBody { review })))
}
