//! Analytics: traffic recording plus admin read-side rollups. Page views
//! accumulate into one row per calendar day through an upsert, so concurrent
//! recorders only ever increment.

use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::domain::money;
use crate::error::ApiError;
use crate::http::{Empty, Envelope};
use crate::models::analytics::{
    AnalyticsDay, CustomerSpend, DashboardStats, ProductSales, SalesDay,
};
use crate::state::AppState;

const SOURCES: &[&str] = &["direct", "organic", "referral", "social", "paid"];
const DEVICES: &[&str] = &["desktop", "mobile", "tablet"];

#[derive(Debug, Default, Deserialize)]
pub struct PageViewRequest {
    pub source: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub period: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<i64>,
}

impl PeriodParams {
    fn days(&self) -> i64 {
        self.period.unwrap_or(30).clamp(1, 365)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBody {
    pub stats: DashboardStats,
    pub traffic: Vec<AnalyticsDay>,
}

#[derive(Serialize)]
pub struct SalesBody {
    pub sales: Vec<SalesDay>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSalesBody {
    pub top_products: Vec<ProductSales>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomersBody {
    pub new_customers: i64,
    pub top_customers: Vec<CustomerSpend>,
}

pub async fn record_page_view(
    State(s): State<AppState>,
    Json(r): Json<PageViewRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let source = r.source.as_deref().filter(|v| SOURCES.contains(v)).unwrap_or("direct");
    let device = r.device.as_deref().filter(|v| DEVICES.contains(v)).unwrap_or("desktop");

    sqlx::query(
        "INSERT INTO analytics_daily (id, date, page_views, \
         source_direct, source_organic, source_referral, source_social, source_paid, \
         device_desktop, device_mobile, device_tablet) \
         VALUES ($1, CURRENT_DATE, 1, \
         CASE WHEN $2 = 'direct' THEN 1 ELSE 0 END, \
         CASE WHEN $2 = 'organic' THEN 1 ELSE 0 END, \
         CASE WHEN $2 = 'referral' THEN 1 ELSE 0 END, \
         CASE WHEN $2 = 'social' THEN 1 ELSE 0 END, \
         CASE WHEN $2 = 'paid' THEN 1 ELSE 0 END, \
         CASE WHEN $3 = 'desktop' THEN 1 ELSE 0 END, \
         CASE WHEN $3 = 'mobile' THEN 1 ELSE 0 END, \
         CASE WHEN $3 = 'tablet' THEN 1 ELSE 0 END) \
         ON CONFLICT (date) DO UPDATE SET \
         page_views = analytics_daily.page_views + 1, \
         source_direct = analytics_daily.source_direct + EXCLUDED.source_direct, \
         source_organic = analytics_daily.source_organic + EXCLUDED.source_organic, \
         source_referral = analytics_daily.source_referral + EXCLUDED.source_referral, \
         source_social = analytics_daily.source_social + EXCLUDED.source_social, \
         source_paid = analytics_daily.source_paid + EXCLUDED.source_paid, \
         device_desktop = analytics_daily.device_desktop + EXCLUDED.device_desktop, \
         device_mobile = analytics_daily.device_mobile + EXCLUDED.device_mobile, \
         device_tablet = analytics_daily.device_tablet + EXCLUDED.device_tablet",
    )
    .bind(Uuid::now_v7())
    .bind(source)
    .bind(device)
    .execute(&s.db)
    .await?;

    Ok(Json(Envelope::ok(Empty {})))
}

pub async fn get_dashboard(
    State(s): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Envelope<DashboardBody>>, ApiError> {
    let (total_revenue, total_orders) = sqlx::query_as::<_, (Decimal, i64)>(
        "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM orders WHERE order_status <> 'cancelled'",
    )
    .fetch_one(&s.db)
    .await?;
    let total_customers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(&s.db)
            .await?;
    let page_views: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(page_views), 0) FROM analytics_daily \
         WHERE date >= CURRENT_DATE - INTERVAL '30 days'",
    )
    .fetch_one(&s.db)
    .await?;

    let average_order_value = if total_orders > 0 {
        money::round(total_revenue / Decimal::from(total_orders))
    } else {
        Decimal::ZERO
    };

    let traffic = sqlx::query_as::<_, AnalyticsDay>(
        "SELECT * FROM analytics_daily WHERE date >= CURRENT_DATE - INTERVAL '30 days' \
         ORDER BY date ASC",
    )
    .fetch_all(&s.db)
    .await?;

    Ok(Json(Envelope::ok(DashboardBody {
        stats: DashboardStats {
            total_revenue,
            total_orders,
            total_customers,
            average_order_value,
            page_views,
        },
        traffic,
    })))
}

pub async fn get_sales(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<PeriodParams>,
) -> Result<Json<Envelope<SalesBody>>, ApiError> {
    let sales = sqlx::query_as::<_, SalesDay>(
        "SELECT o.created_at::date AS date, COUNT(DISTINCT o.id) AS orders, \
         COALESCE(SUM(oi.quantity), 0) AS sales, COALESCE(SUM(oi.subtotal), 0) AS revenue \
         FROM orders o JOIN order_items oi ON oi.order_id = o.id \
         WHERE o.order_status <> 'cancelled' \
         AND o.created_at >= CURRENT_DATE - ($1 * INTERVAL '1 day') \
         GROUP BY o.created_at::date ORDER BY date ASC",
    )
    .bind(p.days())
    .fetch_all(&s.db)
    .await?;

    Ok(Json(Envelope::ok(SalesBody { sales })))
}

pub async fn get_top_products(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<TopParams>,
) -> Result<Json<Envelope<ProductSalesBody>>, ApiError> {
    let top_products = sqlx::query_as::<_, ProductSales>(
        "SELECT oi.product_id, p.name AS product_name, \
         COALESCE(SUM(oi.quantity), 0) AS sales, COALESCE(SUM(oi.subtotal), 0) AS revenue \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         JOIN products p ON p.id = oi.product_id \
         WHERE o.order_status <> 'cancelled' \
         GROUP BY oi.product_id, p.name ORDER BY revenue DESC LIMIT $1",
    )
    .bind(p.limit.unwrap_or(10).clamp(1, 50))
    .fetch_all(&s.db)
    .await?;

    Ok(Json(Envelope::ok(ProductSalesBody { top_products })))
}

pub async fn get_customer_stats(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<PeriodParams>,
) -> Result<Json<Envelope<CustomersBody>>, ApiError> {
    let new_customers: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'customer' \
         AND created_at >= CURRENT_DATE - ($1 * INTERVAL '1 day')",
    )
    .bind(p.days())
    .fetch_one(&s.db)
    .await?;

    let top_customers = sqlx::query_as::<_, CustomerSpend>(
        "SELECT u.id AS user_id, u.name AS user_name, u.email AS user_email, \
         COUNT(o.id) AS orders, COALESCE(SUM(o.total), 0) AS total_spent \
         FROM users u JOIN orders o ON o.user_id = u.id \
         WHERE o.order_status <> 'cancelled' \
         GROUP BY u.id, u.name, u.email ORDER BY total_spent DESC LIMIT 10",
    )
    .fetch_all(&s.db)
    .await?;

    Ok(Json(Envelope::ok(CustomersBody { new_customers, top_customers })))
}
