//! REST API module.
//!
//! Contains all API routes and handlers. Every guarded handler follows the
//! same shape: load a snapshot, build the permission resolver, gate the
//! operation, then touch the repository.

mod activities;
mod members;
mod notifications;
mod pockets;
mod teams;

pub use activities::*;
pub use members::*;
pub use notifications::*;
pub use pockets::*;
pub use teams::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Query parameter carrying the acting member on GET endpoints.
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor: String,
}

/// Turn a permission decision into flow control: `Ok(false)` becomes 403.
pub fn require(allowed: bool, what: &str) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not allowed to {}", what)))
    }
}
