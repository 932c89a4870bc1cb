//! Pass-through CRUD routes for users, rooms and messages.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::Value;
use service_core::error::AppError;

use super::{store_error, ApiJson};
use crate::dtos::{without_password, DataResponse, MessageResponse};
use crate::startup::AppState;

type Rows = Json<DataResponse<Vec<Value>>>;

/// Record bodies must be JSON objects; the store owns the column set.
fn record_body(body: Value) -> Result<Value, AppError> {
    if body.is_object() {
        Ok(body)
    } else {
        Err(AppError::BadRequest(
            "Request body must be a JSON object.".to_string(),
        ))
    }
}

fn public_rows(rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter().map(without_password).collect()
}

#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>) -> Result<Rows, AppError> {
    let users = state
        .users
        .get_all_users()
        .await
        .map_err(|e| store_error(e, "Failed to list users", "No users found"))?;

    Ok(Json(DataResponse::new(public_rows(users))))
}

#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<Value>,
) -> Result<(StatusCode, Rows), AppError> {
    let user = record_body(body)?;
    let created = state
        .users
        .create_user(&user)
        .await
        .map_err(|e| store_error(e, "Failed to create user", "User not found"))?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(public_rows(created)))))
}

#[tracing::instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Value>>, AppError> {
    let user = state
        .users
        .get_user_by_id(&id)
        .await
        .map_err(|e| store_error(e, "Failed to fetch user", "User not found"))?;

    Ok(Json(DataResponse::new(without_password(user))))
}

#[tracing::instrument(skip_all)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DataResponse<Value>>, AppError> {
    let user = state
        .auth
        .get_user_by_email(&email)
        .await
        .map_err(|e| store_error(e, "Failed to fetch user", "User not found"))?;

    Ok(Json(DataResponse::new(without_password(user))))
}

#[tracing::instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): ApiJson<Value>,
) -> Result<Rows, AppError> {
    let updates = record_body(body)?;
    let updated = state
        .users
        .update_user(&id, &updates)
        .await
        .map_err(|e| store_error(e, "Failed to update user", "User not found"))?;

    if updated.is_empty() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(DataResponse::new(public_rows(updated))))
}

#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .users
        .delete_user(&id)
        .await
        .map_err(|e| store_error(e, "Failed to delete user", "User not found"))?;

    tracing::info!(user_id = %id, "User deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted.".to_string(),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn create_room(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<Value>,
) -> Result<(StatusCode, Rows), AppError> {
    let room = record_body(body)?;
    let created = state
        .chats
        .create_room(&room)
        .await
        .map_err(|e| store_error(e, "Failed to create room", "Room not found"))?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(created))))
}

#[tracing::instrument(skip(state))]
pub async fn list_user_rooms(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Rows, AppError> {
    let rooms = state
        .chats
        .get_user_rooms(&user_id)
        .await
        .map_err(|e| store_error(e, "Failed to list rooms", "Rooms not found"))?;

    Ok(Json(DataResponse::new(rooms)))
}

#[tracing::instrument(skip_all)]
pub async fn create_message(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<Value>,
) -> Result<(StatusCode, Rows), AppError> {
    let message = record_body(body)?;
    let created = state
        .chats
        .create_message(&message)
        .await
        .map_err(|e| store_error(e, "Failed to create message", "Message not found"))?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(created))))
}

#[tracing::instrument(skip(state))]
pub async fn list_room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Rows, AppError> {
    let messages = state
        .chats
        .get_messages_by_room_id(&room_id)
        .await
        .map_err(|e| store_error(e, "Failed to list messages", "Messages not found"))?;

    Ok(Json(DataResponse::new(messages)))
}
