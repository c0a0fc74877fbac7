//! Pure domain operations: pricing, discounts, the stock ledger and
//! rating aggregation. Nothing in here touches the database.

pub mod discount;
pub mod events;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod rating;
pub mod status;
