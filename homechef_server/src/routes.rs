//! Request handler definitions.
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
use std::str::FromStr;

use actix_web::{get, post, web, web::Data, HttpResponse, Responder};
use homechef_engine::{
    db_types::{EntityKind, OrderId},
    OrderFlowApi,
    OrderManagement,
    RatingStore,
    ReviewApi,
    ShiftApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    data_objects::{CreateOrderRequest, CreateOrderResponse, JsonResponse, SubmitReviewRequest},
    errors::ServerError,
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻 Received health check request");
    HttpResponse::Ok().body("👍\n")
}

#[post("/order")]
pub async fn create_order(
    body: web::Json<CreateOrderRequest>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.create_order(body.user_id, body.options()).await?;
    Ok(HttpResponse::Ok().json(CreateOrderResponse { order_id: order.id.as_i64(), total_price: order.total_price }))
}

#[post("/order/{id}/accept")]
pub async fn accept_order(
    path: web::Path<i64>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.accept_order(OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/order/{id}/call-delivery")]
pub async fn call_delivery(
    path: web::Path<i64>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.call_delivery(OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/order/{id}/pick-up")]
pub async fn pick_up(
    path: web::Path<i64>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.pick_up(OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/order/{id}/deliver")]
pub async fn deliver(
    path: web::Path<i64>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.deliver(OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/order/{id}/reject")]
pub async fn reject_order(
    path: web::Path<i64>,
    api: Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.reject_order(OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/order/{id}")]
pub async fn order_by_id(path: web::Path<i64>, db: Data<SqliteDatabase>) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let order = db
        .fetch_order_with_items(order_id)
        .await?
        .ok_or(ServerError::BackendError(homechef_engine::MarketplaceError::OrderNotFound(order_id)))?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/orders/user/{id}")]
pub async fn orders_for_user(path: web::Path<i64>, db: Data<SqliteDatabase>) -> Result<HttpResponse, ServerError> {
    let orders = db.orders_for_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[get("/orders/shift/{id}")]
pub async fn orders_for_shift(
    path: web::Path<i64>,
    api: Data<ShiftApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_shift(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[post("/review")]
pub async fn submit_review(
    body: web::Json<SubmitReviewRequest>,
    api: Data<ReviewApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let review = api.submit_review(body.into_inner().into()).await?;
    debug!("💻 Review #{} accepted", review.id);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Review #{} accepted", review.id))))
}

#[post("/shift/open/{chef_id}")]
pub async fn open_shift(
    path: web::Path<i64>,
    api: Data<ShiftApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let shift = api.open_shift(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shift))
}

#[post("/shift/close/{chef_id}")]
pub async fn close_shift(
    path: web::Path<i64>,
    api: Data<ShiftApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    match api.close_shift(path.into_inner()).await? {
        Some(shift) => Ok(HttpResponse::Ok().json(shift)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::success("No active shift to close"))),
    }
}

#[get("/shift/active/{chef_id}")]
pub async fn active_shift(
    path: web::Path<i64>,
    api: Data<ShiftApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let shift = api.active_shift_for_chef(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shift))
}

#[get("/rating/{kind}/{id}")]
pub async fn rating(path: web::Path<(String, i64)>, db: Data<SqliteDatabase>) -> Result<HttpResponse, ServerError> {
    let (kind, entity_id) = path.into_inner();
    let kind = EntityKind::from_str(&kind).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    let aggregate = db.fetch_aggregate(kind, entity_id).await?;
    Ok(HttpResponse::Ok().json(aggregate))
}
