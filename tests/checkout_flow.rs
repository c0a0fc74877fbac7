//! Database-backed flow tests: cart merging, order placement guards and the
//! admin status filter. `#[sqlx::test]` provisions a fresh database per test
//! and applies the crate's migrations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use storefront_api::auth::{AdminUser, AuthKeys, AuthUser, ROLE_ADMIN, ROLE_CUSTOMER};
use storefront_api::error::ApiError;
use storefront_api::gateways::{StubMailer, StubPaymentGateway};
use storefront_api::handlers::cart::{self, AddToCartRequest};
use storefront_api::handlers::orders::{self, AdminOrderListParams, CreateOrderRequest};
use storefront_api::handlers::products::{self, CreateProductRequest, UpdateProductRequest};
use storefront_api::state::AppState;

fn state(pool: PgPool) -> AppState {
    AppState {
        db: pool,
        nats: None,
        auth: Arc::new(AuthKeys::new("test-secret", 7)),
        payments: Arc::new(StubPaymentGateway),
        mailer: Arc::new(StubMailer),
    }
}

fn admin() -> AdminUser {
    AdminUser(AuthUser { id: Uuid::now_v7(), role: ROLE_ADMIN.to_string() })
}

async fn seed_customer(pool: &PgPool) -> AuthUser {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id, name, email, password_hash) VALUES ($1, 'Test Buyer', $2, 'x')")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .execute(pool)
        .await
        .unwrap();
    AuthUser { id, role: ROLE_CUSTOMER.to_string() }
}

async fn seed_product(s: &AppState, stock: i32, discount_price: Option<Decimal>) -> Uuid {
    let (_, Json(envelope)) = products::create_product(
        State(s.clone()),
        admin(),
        Json(CreateProductRequest {
            name: "Walnut Desk".into(),
            description: None,
            price: dec!(120.00),
            discount_price,
            category: "furniture".into(),
            image: None,
            images: None,
            stock: Some(stock),
            sku: None,
            tags: None,
            is_featured: None,
        }),
    )
    .await
    .unwrap();
    envelope.body.product.id
}

fn order_request() -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address: json!({ "city": "Lagos" }),
        billing_address: None,
        payment_method: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_cart_cannot_checkout(pool: PgPool) {
    let s = state(pool.clone());
    let buyer = seed_customer(&pool).await;

    let err = orders::create_order(State(s), buyer, Json(order_request()))
        .await
        .err()
        .expect("checkout with no cart should be rejected");
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m == "Cart is empty"));

    let orders_placed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(&pool).await.unwrap();
    assert_eq!(orders_placed, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_add_merges_cart_line(pool: PgPool) {
    let s = state(pool.clone());
    let buyer = seed_customer(&pool).await;
    let product_id = seed_product(&s, 10, None).await;

    for quantity in [1, 2] {
        cart::add_to_cart(
            State(s.clone()),
            buyer.clone(),
            Json(AddToCartRequest { product_id, quantity }),
        )
        .await
        .unwrap();
    }

    let lines: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT product_id, quantity FROM cart_items")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(lines, vec![(product_id, 3)]);

    let Json(envelope) = cart::get_cart(State(s), buyer).await.unwrap();
    assert_eq!(envelope.body.cart.items.len(), 1);
    assert_eq!(envelope.body.cart.items[0].quantity, 3);
    assert_eq!(envelope.body.cart.subtotal, dec!(360.00));
    assert_eq!(envelope.body.cart.total, dec!(396.00));
}

#[sqlx::test(migrations = "./migrations")]
async fn oversold_order_rolls_back_completely(pool: PgPool) {
    let s = state(pool.clone());
    let buyer = seed_customer(&pool).await;
    let product_id = seed_product(&s, 2, None).await;

    // Two adds merge past the add-time stock check into a 3-unit line.
    for quantity in [2, 1] {
        cart::add_to_cart(
            State(s.clone()),
            buyer.clone(),
            Json(AddToCartRequest { product_id, quantity }),
        )
        .await
        .unwrap();
    }

    let err = orders::create_order(State(s), buyer, Json(order_request()))
        .await
        .err()
        .expect("order beyond stock should be rejected");
    assert!(matches!(err, ApiError::BusinessRule(ref m) if m.starts_with("Insufficient stock")));

    // Nothing moved: no order, no ledger entry, inventory and cart untouched.
    let orders_placed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(&pool).await.unwrap();
    assert_eq!(orders_placed, 0);
    let sales: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM inventory_history WHERE movement = 'sale'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(sales, 0);
    let (quantity, reserved): (i32, i32) =
        sqlx::query_as("SELECT quantity, reserved FROM inventory WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((quantity, reserved), (2, 0));
    let line_quantity: i32 =
        sqlx::query_scalar("SELECT quantity FROM cart_items WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(line_quantity, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn order_within_stock_decrements_and_clears_cart(pool: PgPool) {
    let s = state(pool.clone());
    let buyer = seed_customer(&pool).await;
    let product_id = seed_product(&s, 5, None).await;

    cart::add_to_cart(
        State(s.clone()),
        buyer.clone(),
        Json(AddToCartRequest { product_id, quantity: 2 }),
    )
    .await
    .unwrap();

    let (_, Json(envelope)) =
        orders::create_order(State(s), buyer, Json(order_request())).await.unwrap();
    assert_eq!(envelope.body.order.items.len(), 1);
    assert_eq!(envelope.body.order.order.subtotal, dec!(240.00));

    let quantity: i32 =
        sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(quantity, 3);
    let stock: i32 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 3);
    let remaining_lines: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM cart_items").fetch_one(&pool).await.unwrap();
    assert_eq!(remaining_lines, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_order_filter_rejects_unknown_status(pool: PgPool) {
    let s = state(pool);
    let err = orders::list_all_orders(
        State(s),
        admin(),
        Query(AdminOrderListParams { status: Some("misplaced".into()), page: None, limit: None }),
    )
    .await
    .err()
    .expect("unknown status filter should be rejected");
    assert!(matches!(err, ApiError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn explicit_null_clears_discount_price(pool: PgPool) {
    let s = state(pool);
    let product_id = seed_product(&s, 5, Some(dec!(99.00))).await;

    let r: UpdateProductRequest =
        serde_json::from_value(json!({ "discountPrice": null })).unwrap();
    let Json(envelope) =
        products::update_product(State(s.clone()), admin(), Path(product_id), Json(r))
            .await
            .unwrap();
    assert_eq!(envelope.body.product.discount_price, None);

    // Omitting the field leaves it alone.
    let r: UpdateProductRequest = serde_json::from_value(json!({ "name": "Oak Desk" })).unwrap();
    let Json(envelope) = products::update_product(State(s), admin(), Path(product_id), Json(r))
        .await
        .unwrap();
    assert_eq!(envelope.body.product.name, "Oak Desk");
    assert_eq!(envelope.body.product.discount_price, None);
}
