//! Registration and login endpoints.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::models::{LoginRequest, RegisterRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Registered {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
}

/// POST /register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Registered> {
    let Json(request) = payload?;
    let id = state.auth.register(request).await?;
    created(Registered { id })
}

/// POST /login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<IssuedToken> {
    let Json(request) = payload?;
    let token = state.auth.login(request).await?;
    success(IssuedToken { token })
}
