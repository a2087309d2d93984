//! Role-aware resolution of a single banner for a (tag, feature) query.

use crate::auth::{visibility, Visibility};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Content, Role, UserBannerQuery};

/// Resolve the content visible to `role` for `query`.
///
/// A banner matches when its tag set contains the query tag and its feature
/// equals the query feature. Admins see inactive banners too. When several
/// banners match, the eligible one with the lowest id wins.
/// `use_last_revision` has no effect.
pub async fn resolve(
    repo: &Repository,
    query: &UserBannerQuery,
    role: Role,
) -> Result<Content, AppError> {
    let active_only = match visibility(role) {
        Visibility::All => false,
        Visibility::ActiveOnly => true,
    };

    repo.find_content(query.tag_id, query.feature_id, active_only)
        .await
}
