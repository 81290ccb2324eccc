use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use homechef_engine::MarketplaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("{0}")]
    BackendError(#[from] MarketplaceError),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BackendError(e) => match e {
                MarketplaceError::InvalidRating(_)
                | MarketplaceError::EmptyCart(_)
                | MarketplaceError::MixedChefCart(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::OrderNotFound(_) | MarketplaceError::ShiftNotFound(_) => StatusCode::NOT_FOUND,
                MarketplaceError::InvalidTransition { .. }
                | MarketplaceError::ShiftAlreadyActive(_)
                | MarketplaceError::ReviewAlreadyExists { .. } => StatusCode::CONFLICT,
                MarketplaceError::NoDeliveryAddress(_)
                | MarketplaceError::ChefOffline(_)
                | MarketplaceError::OrderNotReviewable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MarketplaceError::DatabaseError(_) | MarketplaceError::SerializationError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) | Self::IOError(_) | Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
