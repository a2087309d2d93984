//! Authentication and authorization.
//!
//! Password hashing, session tokens, the role policy, and the middleware that
//! turns a bearer token into a [`Session`] request extension.

pub mod password;
pub mod policy;
pub mod token;

pub use password::{PasswordAuthenticator, PasswordCheck};
pub use policy::{authorize, require, visibility, Decision, Operation, Visibility};
pub use token::{Session, TokenIssuer};

use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;

/// Bearer-token authentication layer.
///
/// On success the verified [`Session`] is inserted into the request
/// extensions for handlers to extract.
pub async fn session_auth_layer(
    tokens: Arc<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    match tokens.verify(&bearer) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", request.uri().path(), e);
            e.into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Result<String, AppError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() && !token.contains(' ') => Ok(token.to_string()),
        _ => Err(AppError::Authentication(
            "Invalid authorization header".to_string(),
        )),
    }
}
