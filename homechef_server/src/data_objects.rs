use hc_common::Money;
use homechef_engine::db_types::{CheckoutOptions, NewReview, OrderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    #[serde(default)]
    pub leave_by_door: bool,
    #[serde(default)]
    pub call_beforehand: bool,
}

impl CreateOrderRequest {
    pub fn options(&self) -> CheckoutOptions {
        CheckoutOptions { leave_by_door: self.leave_by_door, call_beforehand: self.call_beforehand }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub total_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub chef_id: i64,
    pub user_id: i64,
    pub order_id: i64,
    pub stars: i32,
    pub comment: Option<String>,
}

impl From<SubmitReviewRequest> for NewReview {
    fn from(request: SubmitReviewRequest) -> Self {
        NewReview {
            chef_id: request.chef_id,
            user_id: request.user_id,
            order_id: OrderId(request.order_id),
            stars: request.stars,
            comment: request.comment,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
}
