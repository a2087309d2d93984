//! Banner decision logic: resolution, sparse-update merge, and the
//! uniqueness pre-check run before creation.

mod merge;
mod resolver;

pub use merge::merge;
pub use resolver::resolve;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::TagSet;

/// Result of the creation-time uniqueness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    Clear,
    Conflict,
}

/// Check whether a banner with exactly `tag_ids` and `feature_id` exists.
///
/// This is only a fast path. Two concurrent creations can both see `Clear`;
/// the store's unique constraint rejects the second insert with a conflict.
pub async fn check_conflict(
    repo: &Repository,
    tag_ids: &TagSet,
    feature_id: i64,
) -> Result<Clearance, AppError> {
    if repo.banner_exists(tag_ids, feature_id).await? {
        Ok(Clearance::Conflict)
    } else {
        Ok(Clearance::Clear)
    }
}
