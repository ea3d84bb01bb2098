use anyhow::Context;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::password,
    domain::role::Role,
    models::{CreateUserEntity, PublicUser, UserEntity},
    schema::users,
    validation::provided,
};

/// Public credential routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(register))
            .routes(utoipa_axum::routes!(login)),
    )
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct LoginReq {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthRes {
    pub user: PublicUser,
    pub token: String,
}

/// Register a new customer account.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Registered successfully", body = StdResponse<AuthRes, String>),
        (status = 409, description = "Email already registered")
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let email = body.email.trim().to_lowercase();
    let existing: Option<i32> = users::table
        .filter(users::email.eq(&email))
        .select(users::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to look up user")?;

    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let user: UserEntity = diesel::insert_into(users::table)
        .values(CreateUserEntity {
            name: body.name,
            email,
            password_hash: password::hash_password(&body.password)?,
            phone: provided(body.phone),
            role: Role::Customer,
            restaurant_id: None,
        })
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await?;

    let token = state.jwt.generate_token(user.id, user.role)?;
    tracing::info!(user_id = user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(AuthRes {
                user: user.into(),
                token,
            }),
            message: Some("Registered successfully"),
        },
    ))
}

/// Exchange email and password for a bearer credential.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<AuthRes, String>),
        (status = 400, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: Option<UserEntity> = users::table
        .filter(users::email.eq(body.email.trim().to_lowercase()))
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to look up user")?;

    let user = match user {
        Some(user) if password::verify_password(&body.password, &user.password_hash) => user,
        _ => {
            tracing::warn!("Failed login attempt");
            return Err(AppError::BadRequest("Invalid credentials".into()));
        }
    };

    let token = state.jwt.generate_token(user.id, user.role)?;

    Ok(StdResponse {
        data: Some(AuthRes {
            user: user.into(),
            token,
        }),
        message: Some("Logged in successfully"),
    })
}
