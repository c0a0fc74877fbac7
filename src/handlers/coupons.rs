//! Coupon validation, atomic application and admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthUser};
use crate::domain::discount::{self, CouponRejection, DiscountType};
use crate::error::ApiError;
use crate::http::{Empty, Envelope, PageParams, Pagination};
use crate::models::coupon::{Coupon, CouponQuote};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponCheckRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub order_amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub user_usage_limit: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub description: Option<String>,
    pub discount_value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    /// Absent leaves the cap untouched; explicit `null` removes it.
    #[serde(default, deserialize_with = "crate::http::double_option")]
    pub max_discount: Option<Option<Decimal>>,
    /// Absent leaves the limit untouched; explicit `null` makes it unlimited.
    #[serde(default, deserialize_with = "crate::http::double_option")]
    pub usage_limit: Option<Option<i32>>,
    pub user_usage_limit: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct CouponQuoteBody {
    pub coupon: CouponQuote,
}

#[derive(Serialize)]
pub struct CouponBody {
    pub coupon: Coupon,
}

#[derive(Serialize)]
pub struct CouponsBody {
    pub coupons: Vec<Coupon>,
}

async fn load_coupon(db: &sqlx::PgPool, code: &str) -> Result<Coupon, ApiError> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(code.trim().to_uppercase())
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Coupon"))
}

async fn user_usage(
    executor: impl sqlx::PgExecutor<'_>,
    coupon_id: Uuid,
    user_id: Uuid,
) -> Result<i32, ApiError> {
    let count = sqlx::query_scalar::<_, i32>(
        "SELECT usage_count FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2",
    )
    .bind(coupon_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(count.unwrap_or(0))
}

/// Error for an apply whose guarded counter update matched zero rows: the
/// coupon changed between load and update, so re-check the fresh row to name
/// the actual rejection. When the re-check still passes, the only guard left
/// is the global usage limit.
fn stale_apply_error(coupon: &Coupon, order_amount: Decimal, user_usage: i32) -> ApiError {
    match discount::check(coupon, Utc::now(), order_amount, user_usage) {
        Err(rejection) => rejection.into(),
        Ok(()) => CouponRejection::UsageLimitReached.into(),
    }
}

pub async fn validate_coupon(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<CouponCheckRequest>,
) -> Result<Json<Envelope<CouponQuoteBody>>, ApiError> {
    r.validate()?;
    let coupon = load_coupon(&s.db, &r.code).await?;
    let used = user_usage(&s.db, coupon.id, auth.id).await?;
    discount::check(&coupon, Utc::now(), r.order_amount, used)?;
    let discount = discount::compute(&coupon, r.order_amount);

    Ok(Json(Envelope::ok(CouponQuoteBody {
        coupon: CouponQuote {
            code: coupon.code,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            discount,
        },
    })))
}

/// Atomic attempt-apply: the limit checks and the counter increments happen
/// under the same transaction, so concurrent redemptions cannot exceed
/// either limit.
pub async fn apply_coupon(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<CouponCheckRequest>,
) -> Result<Json<Envelope<CouponQuoteBody>>, ApiError> {
    r.validate()?;
    let coupon = load_coupon(&s.db, &r.code).await?;

    let mut tx = s.db.begin().await?;
    let used = user_usage(&mut *tx, coupon.id, auth.id).await?;
    discount::check(&coupon, Utc::now(), r.order_amount, used)?;

    let incremented = sqlx::query(
        "UPDATE coupons SET usage_count = usage_count + 1, updated_at = NOW() \
         WHERE id = $1 AND is_active = TRUE AND NOW() BETWEEN start_date AND end_date \
         AND (usage_limit IS NULL OR usage_count < usage_limit)",
    )
    .bind(coupon.id)
    .execute(&mut *tx)
    .await?;
    if incremented.rows_affected() == 0 {
        let fresh = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1")
            .bind(coupon.id)
            .fetch_one(&mut *tx)
            .await?;
        return Err(stale_apply_error(&fresh, r.order_amount, used));
    }

    let user_incremented = sqlx::query_scalar::<_, i32>(
        "INSERT INTO coupon_usages (id, coupon_id, user_id) VALUES ($1, $2, $3) \
         ON CONFLICT (coupon_id, user_id) DO UPDATE \
         SET usage_count = coupon_usages.usage_count + 1, last_used_at = NOW() \
         WHERE coupon_usages.usage_count < $4 \
         RETURNING usage_count",
    )
    .bind(Uuid::now_v7())
    .bind(coupon.id)
    .bind(auth.id)
    .bind(coupon.user_usage_limit)
    .fetch_optional(&mut *tx)
    .await?;
    if user_incremented.is_none() {
        return Err(ApiError::BusinessRule(
            "You have reached the usage limit for this coupon".into(),
        ));
    }
    tx.commit().await?;

    let discount = discount::compute(&coupon, r.order_amount);
    Ok(Json(Envelope::with_message(
        "Coupon applied successfully",
        CouponQuoteBody {
            coupon: CouponQuote {
                code: coupon.code,
                discount_type: coupon.discount_type,
                discount_value: coupon.discount_value,
                discount,
            },
        },
    )))
}

pub async fn list_coupons(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(pager): Query<PageParams>,
) -> Result<Json<Envelope<CouponsBody>>, ApiError> {
    let coupons = sqlx::query_as::<_, Coupon>(
        "SELECT * FROM coupons ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(pager.limit())
    .bind(pager.offset())
    .fetch_all(&s.db)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons").fetch_one(&s.db).await?;

    Ok(Json(Envelope::paginated(
        CouponsBody { coupons },
        Pagination::new(total, pager.page(), pager.limit()),
    )))
}

pub async fn create_coupon(
    State(s): State<AppState>,
    _admin: AdminUser,
    Json(r): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Envelope<CouponBody>>), ApiError> {
    r.validate()?;
    let discount_type = DiscountType::parse(&r.discount_type)
        .ok_or_else(|| ApiError::Validation(format!("Unknown discount type: {}", r.discount_type)))?;
    if r.discount_value < Decimal::ZERO {
        return Err(ApiError::Validation("Discount value must not be negative".into()));
    }
    if r.end_date <= r.start_date {
        return Err(ApiError::Validation("End date must be after start date".into()));
    }

    let coupon = sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (id, code, description, discount_type, discount_value, \
         min_order_amount, max_discount, usage_limit, user_usage_limit, start_date, end_date, \
         is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.code.trim().to_uppercase())
    .bind(r.description.as_deref().unwrap_or(""))
    .bind(discount_type.as_str())
    .bind(r.discount_value)
    .bind(r.min_order_amount.unwrap_or(Decimal::ZERO))
    .bind(r.max_discount)
    .bind(r.usage_limit)
    .bind(r.user_usage_limit.unwrap_or(1))
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Coupon created successfully", CouponBody { coupon })),
    ))
}

pub async fn update_coupon(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateCouponRequest>,
) -> Result<Json<Envelope<CouponBody>>, ApiError> {
    let coupon = sqlx::query_as::<_, Coupon>(
        "UPDATE coupons SET description = COALESCE($2, description), \
         discount_value = COALESCE($3, discount_value), \
         min_order_amount = COALESCE($4, min_order_amount), \
         max_discount = CASE WHEN $5 THEN $6 ELSE max_discount END, \
         usage_limit = CASE WHEN $7 THEN $8 ELSE usage_limit END, \
         user_usage_limit = COALESCE($9, user_usage_limit), \
         start_date = COALESCE($10, start_date), end_date = COALESCE($11, end_date), \
         is_active = COALESCE($12, is_active), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.description)
    .bind(r.discount_value)
    .bind(r.min_order_amount)
    .bind(r.max_discount.is_some())
    .bind(r.max_discount.flatten())
    .bind(r.usage_limit.is_some())
    .bind(r.usage_limit.flatten())
    .bind(r.user_usage_limit)
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Coupon"))?;

    Ok(Json(Envelope::with_message("Coupon updated successfully", CouponBody { coupon })))
}

pub async fn delete_coupon(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&s.db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Coupon"));
    }
    Ok(Json(Envelope::with_message("Coupon deleted successfully", Empty {})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE20".into(),
            description: String::new(),
            discount_type: "percentage".into(),
            discount_value: dec!(20),
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            usage_count: 0,
            user_usage_limit: 1,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stale_rejection_names_deactivation() {
        let mut c = coupon();
        c.is_active = false;
        assert_eq!(stale_apply_error(&c, dec!(100), 0).to_string(), "Coupon is not active");
    }

    #[test]
    fn stale_rejection_names_expiry() {
        let mut c = coupon();
        c.end_date = Utc::now() - Duration::hours(1);
        assert_eq!(stale_apply_error(&c, dec!(100), 0).to_string(), "Coupon has expired");
    }

    #[test]
    fn stale_rejection_defaults_to_usage_limit() {
        assert_eq!(
            stale_apply_error(&coupon(), dec!(100), 0).to_string(),
            "Coupon usage limit exceeded"
        );
    }

    #[test]
    fn update_distinguishes_absent_from_null_limits() {
        let r: UpdateCouponRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(r.max_discount, None);
        assert_eq!(r.usage_limit, None);

        let r: UpdateCouponRequest =
            serde_json::from_value(json!({ "maxDiscount": null, "usageLimit": null })).unwrap();
        assert_eq!(r.max_discount, Some(None));
        assert_eq!(r.usage_limit, Some(None));

        let r: UpdateCouponRequest =
            serde_json::from_value(json!({ "usageLimit": 50 })).unwrap();
        assert_eq!(r.usage_limit, Some(Some(50)));
    }
}
