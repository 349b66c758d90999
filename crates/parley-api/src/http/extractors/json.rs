//! JSON body extractor with API-shaped rejections.

use axum::extract::FromRequest;

use crate::http::error::AppError;

/// Like `axum::Json`, but a malformed or incomplete body is rejected as
/// [`AppError::Validation`] instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
