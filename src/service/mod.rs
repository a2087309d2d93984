//! Application services invoked by the HTTP handlers.

mod auth;
mod banners;

pub use auth::AuthService;
pub use banners::BannerService;
