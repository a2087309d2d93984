//! Data models for the banner service.

mod banner;
mod user;

pub use banner::*;
pub use user::*;
