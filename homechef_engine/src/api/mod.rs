//! The engine's public APIs: checkout and order status flows, review submission, and shift management.
mod order_flow_api;
mod review_api;
mod shift_api;

pub use order_flow_api::OrderFlowApi;
pub use review_api::ReviewApi;
pub use shift_api::ShiftApi;
