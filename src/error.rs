// error kinds and their http status

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::rate_limit::LimiterClass;
use crate::store::StoreError;

/// Field name -> human readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("The given data was invalid.")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("The provided credentials are incorrect.")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("Please log in to access this resource")]
    Unauthenticated,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{}", .class.deny_message())]
    RateLimited {
        class: LimiterClass,
        limit: u32,
        retry_after: u64,
    },

    /// `message` is what the client sees; `source` is only logged.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: BoxError,
    },
}

impl AppError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn internal(message: &'static str, source: impl Into<BoxError>) -> Self {
        AppError::Internal {
            message,
            source: source.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        AppError::invalid(field, format!("The {} field is required.", field.replace('_', " ")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => format!("The {field} field is invalid."),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        AppError::internal("An unexpected error occurred", source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
                "success": false,
            }),
            AppError::InvalidCredentials => json!({
                "data": null,
                "success": false,
                "message": self.to_string(),
                "error": true,
            }),
            AppError::RateLimited {
                class,
                limit,
                retry_after,
            } => return rate_limited_response(*class, *limit, *retry_after),
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
                json!({ "data": null, "success": false, "message": message })
            }
            _ => json!({ "data": null, "success": false, "message": self.to_string() }),
        };

        // expected traffic, keep it quiet
        if matches!(self, AppError::Unauthenticated | AppError::InvalidCredentials) {
            tracing::info!("authentication failed: {self}");
        }

        (status, Json(body)).into_response()
    }
}

fn rate_limited_response(class: LimiterClass, limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "message": class.deny_message(),
        "retry_after": retry_after,
        "success": false,
    });
    let reset = chrono::Utc::now().timestamp() + retry_after as i64;

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
    headers.insert("retry-after", HeaderValue::from(retry_after));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset));
    response
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
