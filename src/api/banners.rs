//! Banner API endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::auth::Session;
use crate::errors::AppError;
use crate::models::{
    Banner, BannerPatch, Content, CreateBannerRequest, FilterQuery, UserBannerQuery,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BannerRef {
    pub banner_id: i64,
}

fn banner_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    }
}

/// GET /user_banner - Resolve the banner content for a tag and feature.
pub async fn user_banner(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    query: Result<Query<UserBannerQuery>, QueryRejection>,
) -> ApiResult<Content> {
    let Query(query) = query?;
    let content = state.banners.resolve(&session, &query).await?;
    success(content)
}

/// GET /banner - List banners by tag and/or feature.
pub async fn list_banners(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Vec<Banner>> {
    let Query(filter) = query?;
    let banners = state.banners.list(&session, filter).await?;
    success(banners)
}

/// POST /banner - Create a banner.
pub async fn create_banner(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<CreateBannerRequest>, JsonRejection>,
) -> ApiResult<BannerRef> {
    let Json(request) = payload?;
    let banner_id = state.banners.create(&session, request).await?;
    created(BannerRef { banner_id })
}

/// PATCH /banner/:id - Apply a sparse update.
pub async fn update_banner(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BannerPatch>, JsonRejection>,
) -> ApiResult<Banner> {
    let id = banner_id(path)?;
    let Json(patch) = payload?;
    let banner = state.banners.update(&session, id, patch).await?;
    success(banner)
}

/// DELETE /banner/:id - Delete a banner.
pub async fn delete_banner(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<BannerRef> {
    let id = banner_id(path)?;
    state.banners.delete(&session, id).await?;
    success(BannerRef { banner_id: id })
}
