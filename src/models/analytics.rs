use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One per-day traffic snapshot, keyed by calendar day.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDay {
    pub id: Uuid,
    pub date: NaiveDate,
    pub page_views: i64,
    pub source_direct: i64,
    pub source_organic: i64,
    pub source_referral: i64,
    pub source_social: i64,
    pub source_paid: i64,
    pub device_desktop: i64,
    pub device_mobile: i64,
    pub device_tablet: i64,
}

/// Read-side rollup of one day's orders.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesDay {
    pub date: NaiveDate,
    pub orders: i64,
    pub sales: i64,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: Uuid,
    pub product_name: String,
    pub sales: i64,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSpend {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub orders: i64,
    pub total_spent: Decimal,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub total_customers: i64,
    pub average_order_value: Decimal,
    pub page_views: i64,
}
