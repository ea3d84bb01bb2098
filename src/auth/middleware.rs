use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::{
    app_error::AppError,
    app_state::AppState,
    auth::{CurrentUser, JwtService},
    models::UserEntity,
    schema::users,
};

/// Authentication middleware.
///
/// Extracts `Authorization: Bearer <token>`, validates it and reloads the
/// user so role and restaurant binding reflect the latest employee changes.
/// Injects [`CurrentUser`] into the request extensions.
///
/// Every failure (no header, bad scheme, bad signature, expiry, deleted
/// user) is `Unauthenticated`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match header.and_then(JwtService::extract_from_header) {
        Some(token) => token,
        None => {
            tracing::warn!(uri = %req.uri(), "Missing bearer credential");
            return Err(AppError::Unauthenticated("Not authorized, no token".into()));
        }
    };

    let claims = state.jwt.validate_token(token).map_err(|err| {
        tracing::warn!(uri = %req.uri(), error = %err, "Rejected bearer credential");
        AppError::from(err)
    })?;
    let user_id = claims.user_id()?;

    // The connection goes back to the pool before the handler checks out its own.
    let user: UserEntity = {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        users::table
            .find(user_id)
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to load authenticated user")?
            .ok_or_else(|| AppError::Unauthenticated("Not authorized, user not found".into()))?
    };

    req.extensions_mut().insert(CurrentUser::from(&user));
    Ok(next.run(req).await)
}
