//! Product catalog handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::domain::events::ProductEvent;
use crate::error::ApiError;
use crate::http::{Empty, Envelope, PageParams, Pagination};
use crate::models::product::Product;
use crate::state::AppState;

/// Recognized sort orders for the catalog listing.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl ProductSort {
    fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY created_at DESC",
            Self::PriceAsc => " ORDER BY price ASC",
            Self::PriceDesc => " ORDER BY price DESC",
            Self::Rating => " ORDER BY rating DESC",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductListParams {
    fn pager(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// Absent leaves the discount untouched; explicit `null` clears it.
    #[serde(default, deserialize_with = "crate::http::double_option")]
    pub discount_price: Option<Option<Decimal>>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Serialize)]
pub struct ProductsBody {
    pub products: Vec<Product>,
}

#[derive(Serialize)]
pub struct ProductBody {
    pub product: Product,
}

fn check_prices(price: Decimal, discount_price: Option<Decimal>) -> Result<(), ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::Validation("Price must not be negative".into()));
    }
    if discount_price.is_some_and(|d| d < Decimal::ZERO) {
        return Err(ApiError::Validation("Discount price must not be negative".into()));
    }
    Ok(())
}

pub async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ProductListParams>,
) -> Result<Json<Envelope<ProductsBody>>, ApiError> {
    let mut query = QueryBuilder::new("SELECT * FROM products WHERE is_active = TRUE");
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE is_active = TRUE");
    for builder in [&mut query, &mut count] {
        if let Some(category) = &p.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(search) = &p.search {
            let pattern = format!("%{search}%");
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
    let pager = p.pager();
    query.push(p.sort.unwrap_or_default().order_by());
    query.push(" LIMIT ").push_bind(pager.limit()).push(" OFFSET ").push_bind(pager.offset());

    let products = query.build_query_as::<Product>().fetch_all(&s.db).await?;
    let total: i64 = count.build_query_scalar().fetch_one(&s.db).await?;

    Ok(Json(Envelope::paginated(
        ProductsBody { products },
        Pagination::new(total, pager.page(), pager.limit()),
    )))
}

pub async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ProductBody>>, ApiError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(Envelope::ok(ProductBody { product })))
}

pub async fn get_featured_products(
    State(s): State<AppState>,
) -> Result<Json<Envelope<ProductsBody>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_featured = TRUE AND is_active = TRUE LIMIT 8",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(Envelope::ok(ProductsBody { products })))
}

pub async fn create_product(
    State(s): State<AppState>,
    _admin: AdminUser,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Envelope<ProductBody>>), ApiError> {
    r.validate()?;
    check_prices(r.price, r.discount_price)?;
    let stock = r.stock.unwrap_or(0);
    if stock < 0 {
        return Err(ApiError::Validation("Stock must not be negative".into()));
    }

    let mut tx = s.db.begin().await?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, discount_price, category, image, \
         images, stock, sku, tags, is_featured) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(r.description.as_deref().unwrap_or(""))
    .bind(r.price)
    .bind(r.discount_price)
    .bind(&r.category)
    .bind(r.image.as_deref().unwrap_or(""))
    .bind(r.images.clone().unwrap_or_default())
    .bind(stock)
    .bind(&r.sku)
    .bind(r.tags.clone().unwrap_or_default())
    .bind(r.is_featured.unwrap_or(false))
    .fetch_one(&mut *tx)
    .await?;

    // Seed the authoritative ledger row with the initial stock.
    sqlx::query(
        "INSERT INTO inventory (id, product_id, quantity, available) VALUES ($1, $2, $3, $3)",
    )
    .bind(Uuid::now_v7())
    .bind(product.id)
    .bind(stock)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let event = ProductEvent::Created { product_id: product.id, name: product.name.clone() };
    s.publish(event.subject(), &event).await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Product created successfully", ProductBody { product })),
    ))
}

pub async fn update_product(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProductRequest>,
) -> Result<Json<Envelope<ProductBody>>, ApiError> {
    check_prices(r.price.unwrap_or(Decimal::ZERO), r.discount_price.flatten())?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
         price = COALESCE($4, price), \
         discount_price = CASE WHEN $5 THEN $6 ELSE discount_price END, \
         category = COALESCE($7, category), image = COALESCE($8, image), \
         images = COALESCE($9, images), tags = COALESCE($10, tags), \
         is_featured = COALESCE($11, is_featured), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.discount_price.is_some())
    .bind(r.discount_price.flatten())
    .bind(&r.category)
    .bind(&r.image)
    .bind(&r.images)
    .bind(&r.tags)
    .bind(r.is_featured)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Product"))?;

    Ok(Json(Envelope::with_message("Product updated successfully", ProductBody { product })))
}

pub async fn delete_product(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product"));
    }
    Ok(Json(Envelope::with_message("Product deleted successfully", Empty {})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn update_distinguishes_absent_from_null_discount() {
        let r: UpdateProductRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(r.discount_price, None);

        let r: UpdateProductRequest =
            serde_json::from_value(json!({ "discountPrice": null })).unwrap();
        assert_eq!(r.discount_price, Some(None));

        let r: UpdateProductRequest =
            serde_json::from_value(json!({ "discountPrice": 25 })).unwrap();
        assert_eq!(r.discount_price, Some(Some(dec!(25))));
    }
}
