use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::repository;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// The user named by the `X-User-Id` header. Session handling lives in front
/// of this service; here the header only has to name an existing user.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        repository::find_user_by_id(&state.db, id)
            .await?
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
