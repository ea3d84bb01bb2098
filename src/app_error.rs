use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    auth::JwtError,
    domain::{
        billing::BillingError, order::StatusPolicyError, role::RoleTransitionError,
    },
};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Standard JSON envelope for every response body.
#[derive(Serialize, ToSchema, Debug)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, invalid or expired credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the role or ownership check failed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The payload failed validation, or a referenced entity exists under a
    /// different scope.
    #[error("{0}")]
    BadRequest(String),

    /// A uniqueness or at-most-once invariant would be violated.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Other(err) => {
                tracing::error!("Internal error: {:#}", err);
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            StdResponse::<(), String> {
                data: None,
                message: Some(message),
            },
        )
            .into_response()
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Record not found".into()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::Conflict(conflict_message(info.constraint_name()).into())
            }
            other => AppError::Other(other.into()),
        }
    }
}

/// Human-readable message for a unique index hit by a racing writer.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "User already exists",
        Some("restaurants_name_key") => "Restaurant name already taken.",
        Some("restaurants_tax_id_key") => "Tax id already registered.",
        Some("restaurants_owner_id_key") => "You have already registered a restaurant.",
        Some("employees_user_id_key") => "User is already an employee",
        Some("bills_order_id_key") => "Bill already generated for this order",
        _ => "Resource already exists",
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => {
                AppError::Unauthenticated("Session expired, please log in again".into())
            }
            JwtError::InvalidToken(_) => {
                AppError::Unauthenticated("Not authorized, token failed".into())
            }
            JwtError::GenerationFailed(_) => AppError::Other(err.into()),
        }
    }
}

impl From<RoleTransitionError> for AppError {
    fn from(err: RoleTransitionError) -> Self {
        match err {
            RoleTransitionError::AlreadyOwner | RoleTransitionError::OwnerLocked => {
                AppError::Conflict(err.to_string())
            }
            RoleTransitionError::StaffCannotOwn => AppError::Forbidden(err.to_string()),
            RoleTransitionError::AdminNotAssignable => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<StatusPolicyError> for AppError {
    fn from(err: StatusPolicyError) -> Self {
        match err {
            StatusPolicyError::BilledReserved => AppError::BadRequest(err.to_string()),
            StatusPolicyError::ChefRestricted | StatusPolicyError::RoleNotPermitted(_) => {
                AppError::Forbidden(err.to_string())
            }
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
