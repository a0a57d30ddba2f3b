use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("invalid period '{0}': expected <number><h|d|w|m>, e.g. 24h, 7d, 1.5w, 1m")]
    InvalidPeriod(String),

    #[error("{0} not found on GitHub")]
    UpstreamNotFound(String),

    #[error("error fetching {context}: {message}")]
    UpstreamError { context: String, message: String },

    #[error("database error: {0}")]
    StoreError(#[from] sea_orm::DbErr),

    #[error("database is not configured")]
    StoreUnavailable,

    #[error("request canceled: {0}")]
    Canceled(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn upstream(context: impl Into<String>, message: impl ToString) -> Self {
        AppError::UpstreamError {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Prefix the failing sub-fetch onto an upstream error.
    ///
    /// A not-found below the profile lookup becomes an upstream failure.
    pub fn within(self, what: &str) -> Self {
        match self {
            AppError::UpstreamError { context, message } => AppError::UpstreamError {
                context: format!("{} ({})", what, context),
                message,
            },
            AppError::UpstreamNotFound(resource) => AppError::UpstreamError {
                context: what.to_string(),
                message: format!("{} not found", resource),
            },
            other => other,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } | AppError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Canceled(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}
