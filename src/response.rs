use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::Page;

// Pagination block attached to list responses
#[derive(Debug, Serialize)]
pub struct MetaData {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

// Success envelope: {data, meta_data, message, success}
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta_data: Option<MetaData>,
    pub message: String,
    pub success: bool,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            meta_data: None,
            message: message.into(),
            success: true,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::ok(data, message).with_status(StatusCode::CREATED)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    // `path` is used to build next/prev links
    pub fn page(page: Page<T>, path: &str, message: impl Into<String>) -> Self {
        let meta_data = page.request.map(|req| {
            let last_page = page.last_page();
            let link = |n: u64| format!("{path}?page={n}&perPage={}", req.per_page);
            MetaData {
                total: page.total,
                per_page: req.per_page,
                current_page: req.page,
                last_page,
                next_page_url: (req.page < last_page).then(|| link(req.page + 1)),
                prev_page_url: (req.page > 1).then(|| link(req.page - 1)),
            }
        });
        Self {
            meta_data,
            ..Self::ok(page.items, message)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
