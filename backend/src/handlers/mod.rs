//! HTTP handlers

pub mod alert;
pub mod auth;
pub mod crop;
pub mod farm;
pub mod health;
pub mod prediction;
pub mod profile;
pub mod question;
pub mod recommendation;
pub mod weather;

pub use alert::*;
pub use auth::*;
pub use crop::*;
pub use farm::*;
pub use health::*;
pub use prediction::*;
pub use profile::*;
pub use question::*;
pub use recommendation::*;
pub use weather::*;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::models::UserRole;

use crate::error::AppResult;
use crate::middleware::{AuthUser, CurrentUser};

/// `201 Created` pointing at the new resource
pub(crate) fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}

/// The current user, provided they are a farmer
pub(crate) fn farmer(current_user: &CurrentUser) -> AppResult<&AuthUser> {
    current_user.0.require_role(UserRole::Farmer)?;
    Ok(&current_user.0)
}

/// The current user, provided they are an expert
pub(crate) fn expert(current_user: &CurrentUser) -> AppResult<&AuthUser> {
    current_user.0.require_role(UserRole::Expert)?;
    Ok(&current_user.0)
}
