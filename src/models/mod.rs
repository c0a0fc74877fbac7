//! Persistence records and the response views assembled from them.

pub mod analytics;
pub mod cart;
pub mod coupon;
pub mod inventory;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
pub mod wishlist;
