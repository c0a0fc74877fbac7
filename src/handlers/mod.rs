//! Request handlers, one module per resource.

pub mod analytics;
pub mod auth;
pub mod cart;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;
