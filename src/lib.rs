//! Storefront API
//!
//! REST backend for a small e-commerce storefront: catalog, cart, checkout,
//! coupons, inventory, reviews, wishlists and traffic analytics, backed by
//! Postgres.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateways;
pub mod handlers;
pub mod http;
pub mod models;
pub mod routes;
pub mod state;
