//! Order placement, payment and admin order management.
//!
//! Placement runs in a single transaction: every line's stock decrement is
//! a guarded update, and any failure rolls the whole order back.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::JsonValue;
use sqlx::QueryBuilder;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::domain::events::OrderEvent;
use crate::domain::money::{round, to_minor_units};
use crate::domain::status::{OrderStatus, PaymentStatus};
use crate::error::ApiError;
use crate::http::{Envelope, PageParams, Pagination};
use crate::models::cart::{Cart, CartItem};
use crate::models::order::{Order, OrderItem, OrderView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: JsonValue,
    pub billing_address: Option<JsonValue>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub order_id: Uuid,
    pub payment_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderListParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct OrderBody {
    pub order: OrderView,
}

#[derive(Serialize)]
pub struct OrdersBody {
    pub orders: Vec<OrderView>,
}

async fn attach_items(
    db: &sqlx::PgPool,
    orders: Vec<Order>,
) -> Result<Vec<OrderView>, ApiError> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderView::assemble(order, items)
        })
        .collect())
}

pub async fn create_order(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<OrderBody>>), ApiError> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?;
    let Some(cart) = cart else {
        return Err(ApiError::BusinessRule("Cart is empty".into()));
    };
    let items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .fetch_all(&s.db)
        .await?;
    if items.is_empty() {
        return Err(ApiError::BusinessRule("Cart is empty".into()));
    }

    let order_number = format!("ORD-{:08}", rand::random::<u32>());
    let mut tx = s.db.begin().await?;

    // Stock leaves the ledger first; a failed guard aborts everything.
    for item in &items {
        let decremented = sqlx::query(
            "UPDATE inventory SET quantity = quantity - $2, \
             available = quantity - $2 - reserved, updated_at = NOW() \
             WHERE product_id = $1 AND quantity - reserved >= $2",
        )
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
        if decremented.rows_affected() == 0 {
            let name = sqlx::query_scalar::<_, String>("SELECT name FROM products WHERE id = $1")
                .bind(item.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or_else(|| "product".into());
            return Err(ApiError::BusinessRule(format!("Insufficient stock for {name}")));
        }
        sqlx::query(
            "INSERT INTO inventory_history (id, product_id, movement, quantity, reason, reference) \
             VALUES ($1, $2, 'sale', $3, 'Order placed', $4)",
        )
        .bind(Uuid::now_v7())
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(&order_number)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE products SET stock = i.quantity, updated_at = NOW() \
             FROM inventory i WHERE products.id = i.product_id AND products.id = $1",
        )
        .bind(item.product_id)
        .execute(&mut *tx)
        .await?;
    }

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, user_id, shipping_address, billing_address, \
         subtotal, tax, total, payment_method) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&order_number)
    .bind(auth.id)
    .bind(&r.shipping_address)
    .bind(r.billing_address.clone().unwrap_or_else(|| json!({})))
    .bind(cart.subtotal)
    .bind(cart.tax)
    .bind(cart.total)
    .bind(r.payment_method.as_deref().unwrap_or("card"))
    .fetch_one(&mut *tx)
    .await?;

    let mut order_items = Vec::with_capacity(items.len());
    for item in &items {
        let line = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price, subtotal) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .bind(round(item.price * Decimal::from(item.quantity)))
        .fetch_one(&mut *tx)
        .await?;
        order_items.push(line);
    }

    sqlx::query(
        "UPDATE carts SET subtotal = 0, tax = 0, total = 0, updated_at = NOW() WHERE id = $1",
    )
    .bind(cart.id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart.id).execute(&mut *tx).await?;
    tx.commit().await?;

    let event = OrderEvent::Created { order_id: order.id, user_id: auth.id, total: order.total };
    s.publish(event.subject(), &event).await;

    if let Ok(Some(email)) =
        sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(auth.id)
            .fetch_optional(&s.db)
            .await
    {
        let context = json!({ "orderNumber": order.order_number, "total": order.total });
        if let Err(e) = s.mailer.send("order_confirmation", &email, &context).await {
            tracing::warn!(order = %order.order_number, error = %e, "confirmation email failed");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Order created successfully",
            OrderBody { order: OrderView::assemble(order, order_items) },
        )),
    ))
}

pub async fn get_my_orders(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<OrdersBody>>, ApiError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(Envelope::ok(OrdersBody { orders: attach_items(&s.db, orders).await? })))
}

pub async fn get_order(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<OrderBody>>, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    if order.user_id != auth.id && !auth.is_admin() {
        return Err(ApiError::Forbidden("Not authorized to view this order".into()));
    }
    let mut views = attach_items(&s.db, vec![order]).await?;
    let order = views.pop().ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(Envelope::ok(OrderBody { order })))
}

pub async fn list_all_orders(
    State(s): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<AdminOrderListParams>,
) -> Result<Json<Envelope<OrdersBody>>, ApiError> {
    let status = match &p.status {
        Some(raw) => Some(
            OrderStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Unknown order status: {raw}")))?,
        ),
        None => None,
    };

    let pager = PageParams { page: p.page, limit: p.limit };
    let mut query = QueryBuilder::new("SELECT * FROM orders");
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    if let Some(status) = status {
        for builder in [&mut query, &mut count] {
            builder.push(" WHERE order_status = ").push_bind(status.as_str());
        }
    }
    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(pager.limit())
        .push(" OFFSET ")
        .push_bind(pager.offset());

    let orders = query.build_query_as::<Order>().fetch_all(&s.db).await?;
    let total: i64 = count.build_query_scalar().fetch_one(&s.db).await?;

    Ok(Json(Envelope::paginated(
        OrdersBody { orders: attach_items(&s.db, orders).await? },
        Pagination::new(total, pager.page(), pager.limit()),
    )))
}

pub async fn update_order_status(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Envelope<OrderBody>>, ApiError> {
    let status = OrderStatus::parse(&r.order_status)
        .ok_or_else(|| ApiError::Validation(format!("Unknown order status: {}", r.order_status)))?;

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Order"))?;

    let event =
        OrderEvent::StatusChanged { order_id: order.id, status: order.order_status.clone() };
    s.publish(event.subject(), &event).await;

    let mut views = attach_items(&s.db, vec![order]).await?;
    let order = views.pop().ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(Envelope::with_message("Order status updated", OrderBody { order })))
}

pub async fn process_payment(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<ProcessPaymentRequest>,
) -> Result<Json<Envelope<OrderBody>>, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(r.order_id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    if order.user_id != auth.id && !auth.is_admin() {
        return Err(ApiError::Forbidden("Not authorized to pay for this order".into()));
    }

    // Gateway failure propagates as-is; the order row stays untouched.
    let receipt = s
        .payments
        .charge(
            to_minor_units(order.total),
            &r.payment_token,
            &format!("Order {}", order.order_number),
        )
        .await?;

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = $2, transaction_id = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(PaymentStatus::Completed.as_str())
    .bind(&receipt.transaction_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("Order"))?;

    let event =
        OrderEvent::Paid { order_id: order.id, transaction_id: receipt.transaction_id.clone() };
    s.publish(event.subject(), &event).await;

    let mut views = attach_items(&s.db, vec![order]).await?;
    let order = views.pop().ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(Envelope::with_message("Payment processed successfully", OrderBody { order })))
}
