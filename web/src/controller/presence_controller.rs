use crate::controller::ApiResponse;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use log::*;

#[derive(Debug, Serialize, ToSchema)]
pub struct OnlineStatus {
    pub user_id: String,
    pub online: bool,
}

/// GET all users that currently hold a live connection
#[utoipa::path(
    get,
    path = "/online_users",
    responses(
        (status = 200, description = "Successfully retrieved the online user ids", body = [String]),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let online = app_state.realtime.online_users();

    debug!("Found {} online users", online.len());

    Json(ApiResponse::new(StatusCode::OK.into(), online))
}

/// GET whether a specific user currently holds a live connection
#[utoipa::path(
    get,
    path = "/online_users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID to check")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the user's online status", body = OnlineStatus),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let online = app_state.realtime.is_online(&user_id);

    debug!("User {user_id} online: {online}");

    Json(ApiResponse::new(
        StatusCode::OK.into(),
        OnlineStatus { user_id, online },
    ))
}
