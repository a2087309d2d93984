//! Banner operations gated by the access policy.

use std::sync::Arc;

use crate::auth::{require, Operation, Session};
use crate::banner::{self, Clearance};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    now_millis, Banner, BannerPatch, Content, CreateBannerRequest, FilterQuery, UserBannerQuery,
};

/// Create, update, delete, resolve and list banners on behalf of a session.
///
/// Every operation checks the policy before touching the store, so a denied
/// caller causes no side effects and learns nothing about existence.
pub struct BannerService {
    repo: Arc<Repository>,
}

impl BannerService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create a banner and return its id.
    pub async fn create(
        &self,
        session: &Session,
        request: CreateBannerRequest,
    ) -> Result<i64, AppError> {
        require(session.role, Operation::CreateBanner)?;
        let new_banner = request.into_new_banner(now_millis())?;

        if banner::check_conflict(&self.repo, &new_banner.tag_ids, new_banner.feature_id).await?
            == Clearance::Conflict
        {
            return Err(AppError::Conflict(
                "Banner with these tag_ids and feature_id already exists".to_string(),
            ));
        }

        let id = self.repo.insert_banner(&new_banner).await?;
        tracing::info!(
            banner_id = id,
            by = session.user_id,
            feature_id = new_banner.feature_id,
            tags = %new_banner.tag_ids,
            "Created banner"
        );
        Ok(id)
    }

    /// Merge `patch` into the stored banner and return the new state.
    pub async fn update(
        &self,
        session: &Session,
        id: i64,
        patch: BannerPatch,
    ) -> Result<Banner, AppError> {
        require(session.role, Operation::UpdateBanner)?;
        patch.validate()?;

        let existing = self.repo.get_banner(id).await?;
        let merged = banner::merge(&existing, &patch, now_millis());
        self.repo.update_banner(id, &merged).await?;

        tracing::info!(banner_id = id, by = session.user_id, "Updated banner");
        Ok(merged)
    }

    pub async fn delete(&self, session: &Session, id: i64) -> Result<(), AppError> {
        require(session.role, Operation::DeleteBanner)?;
        self.repo.delete_banner(id).await?;
        tracing::info!(banner_id = id, by = session.user_id, "Deleted banner");
        Ok(())
    }

    /// Resolve the banner content visible to the session's role.
    pub async fn resolve(
        &self,
        session: &Session,
        query: &UserBannerQuery,
    ) -> Result<Content, AppError> {
        require(session.role, Operation::ResolveBanner)?;
        banner::resolve(&self.repo, query, session.role).await
    }

    pub async fn list(&self, session: &Session, filter: FilterQuery) -> Result<Vec<Banner>, AppError> {
        require(session.role, Operation::ListBanners)?;
        let filter = filter.normalized()?;
        self.repo.list_banners(&filter).await
    }
}
