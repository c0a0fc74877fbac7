//! Route table. Authorization lives in the extractors each handler takes,
//! not in the router.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    analytics, auth, cart, coupons, inventory, orders, products, reviews, wishlist,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-api"})) }),
        )
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/api/products", get(products::list_products).post(products::create_product))
        .route("/api/products/featured", get(products::get_featured_products))
        .route(
            "/api/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/products/:id/reviews",
            get(reviews::list_product_reviews).post(reviews::create_review),
        )
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/items", post(cart::add_to_cart).put(cart::update_cart_item))
        .route("/api/cart/items/:product_id", delete(cart::remove_from_cart))
        .route("/api/orders", get(orders::get_my_orders).post(orders::create_order))
        .route("/api/orders/all", get(orders::list_all_orders))
        .route("/api/orders/payment", post(orders::process_payment))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/status", put(orders::update_order_status))
        .route("/api/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/api/coupons/validate", post(coupons::validate_coupon))
        .route("/api/coupons/apply", post(coupons::apply_coupon))
        .route("/api/coupons/:id", put(coupons::update_coupon).delete(coupons::delete_coupon))
        .route("/api/inventory", get(inventory::list_inventory))
        .route("/api/inventory/low-stock", get(inventory::get_low_stock))
        .route(
            "/api/inventory/:product_id",
            get(inventory::get_product_inventory).put(inventory::adjust_inventory),
        )
        .route("/api/inventory/:product_id/history", get(inventory::get_inventory_history))
        .route("/api/inventory/:product_id/reserve", post(inventory::reserve_stock))
        .route("/api/inventory/:product_id/release", post(inventory::release_reserved_stock))
        .route(
            "/api/reviews/:id",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/api/reviews/:id/helpful", post(reviews::mark_helpful))
        .route("/api/reviews/:id/unhelpful", post(reviews::mark_unhelpful))
        .route("/api/wishlist", get(wishlist::get_wishlist).delete(wishlist::clear_wishlist))
        .route("/api/wishlist/items", post(wishlist::add_to_wishlist))
        .route("/api/wishlist/items/:product_id", delete(wishlist::remove_from_wishlist))
        .route("/api/wishlist/contains/:product_id", get(wishlist::contains_product))
        .route("/api/analytics/pageview", post(analytics::record_page_view))
        .route("/api/analytics/dashboard", get(analytics::get_dashboard))
        .route("/api/analytics/sales", get(analytics::get_sales))
        .route("/api/analytics/products", get(analytics::get_top_products))
        .route("/api/analytics/customers", get(analytics::get_customer_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
