use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejection renders as an `ApiError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
