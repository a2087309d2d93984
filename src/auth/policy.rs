//! Role-based access policy.

use crate::errors::AppError;
use crate::models::Role;

/// Operations subject to the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateBanner,
    UpdateBanner,
    DeleteBanner,
    ListBanners,
    ResolveBanner,
}

impl Operation {
    fn describe(&self) -> &'static str {
        match self {
            Operation::CreateBanner => "create banners",
            Operation::UpdateBanner => "update banners",
            Operation::DeleteBanner => "delete banners",
            Operation::ListBanners => "list banners",
            Operation::ResolveBanner => "view banners",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

/// Which banners a role may see when resolving a single banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Active and inactive banners.
    All,
    ActiveOnly,
}

pub fn authorize(role: Role, operation: Operation) -> Decision {
    match (role, operation) {
        (Role::Admin, _) => Decision::Permit,
        (Role::User, Operation::ResolveBanner) => Decision::Permit,
        (Role::User, _) => Decision::Deny,
    }
}

/// Like [`authorize`], turning a denial into an authorization error.
pub fn require(role: Role, operation: Operation) -> Result<(), AppError> {
    match authorize(role, operation) {
        Decision::Permit => Ok(()),
        Decision::Deny => {
            tracing::warn!(role = %role, ?operation, "Operation denied");
            Err(AppError::Authorization(format!(
                "Only admins can {}",
                operation.describe()
            )))
        }
    }
}

pub fn visibility(role: Role) -> Visibility {
    match role {
        Role::Admin => Visibility::All,
        Role::User => Visibility::ActiveOnly,
    }
}
