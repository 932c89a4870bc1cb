use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use service_core::error::AppError;
use validator::Validate;

use super::{store_error, ApiJson};
use crate::dtos::{without_password, LoginRequest, LoginResponse};
use crate::services::StoreError;
use crate::startup::AppState;

#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    request.validate()?;

    let user = match state
        .auth
        .validate_login(&request.email, &request.password)
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return Err(AppError::Unauthorized(
                "Invalid email or password.".to_string(),
            ));
        }
        Err(e) => return Err(store_error(e, "Failed to validate login", "User not found")),
    };

    tracing::info!("User logged in");

    Ok(Json(LoginResponse {
        success: true,
        user: without_password(user),
    }))
}
