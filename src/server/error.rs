use crate::errors::PortfolioError;
use ntex::http::StatusCode;
use ntex::web::error::WebResponseError;
use ntex::web::{HttpRequest, HttpResponse};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid Ethereum address format")]
    InvalidAddress,

    #[error("Failed to fetch portfolio data")]
    Portfolio(#[source] PortfolioError),

    #[error("Failed to fetch prices")]
    Prices(#[source] PortfolioError),
}

impl From<PortfolioError> for ApiError {
    fn from(e: PortfolioError) -> Self {
        match e {
            PortfolioError::InvalidAddress { .. } => ApiError::InvalidAddress,
            e => ApiError::Portfolio(e),
        }
    }
}

impl WebResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidAddress => StatusCode::BAD_REQUEST,
            ApiError::Portfolio(_) | ApiError::Prices(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self, _: &HttpRequest) -> HttpResponse {
        let body = match self {
            ApiError::InvalidAddress => json!({ "error": self.to_string() }),
            ApiError::Portfolio(source) | ApiError::Prices(source) => {
                error!(error = %source, "{}", self);
                json!({ "error": self.to_string(), "message": source.to_string() })
            }
        };

        HttpResponse::build(self.status_code()).json(&body)
    }
}
