use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;

/// `axum::Json` whose rejections are reported as `AppError::Validation`.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), detail = %rejection.body_text(), "request body rejected");
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected Content-Type: application/json",
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON body",
            JsonRejection::JsonDataError(_) => "Missing or invalid fields in request body",
            _ => "Invalid request body",
        };
        AppError::Validation(message.into())
    }
}
