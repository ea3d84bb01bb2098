use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::role::{Role, RoleChange},
    models::{PublicUser, UpdateProfileEntity, UserEntity},
    schema::{employees, users},
    validation::provided,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_profile, update_profile))
            .routes(utoipa_axum::routes!(update_role))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
    )
}

/// Fetch the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/profile",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<PublicUser, String>)
    )
)]
async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: UserEntity = users::table
        .find(user.id)
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get profile")?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(StdResponse {
        data: Some(PublicUser::from(profile)),
        message: Some("Get profile successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileReq {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

/// Update the authenticated user's own profile. Empty fields are ignored.
#[utoipa::path(
    put,
    path = "/profile",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Updated profile successfully", body = StdResponse<PublicUser, String>)
    )
)]
async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateProfileReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patch = UpdateProfileEntity {
        name: provided(body.name),
        phone: provided(body.phone),
        profile_picture: provided(body.profile_picture),
    };

    let profile: UserEntity = if patch.is_empty() {
        users::table
            .find(user.id)
            .select(UserEntity::as_select())
            .first(conn)
            .await?
    } else {
        diesel::update(users::table.find(user.id))
            .set(&patch)
            .returning(UserEntity::as_returning())
            .get_result(conn)
            .await?
    };

    Ok(StdResponse {
        data: Some(PublicUser::from(profile)),
        message: Some("Updated profile successfully"),
    })
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct UpdateRoleReq {
    #[validate(email)]
    pub email: String,
    pub new_role: Role,
}

/// Assign a role to another user within the caller's restaurant.
///
/// Staff roles bind the user to the caller's restaurant; `customer` unbinds.
/// Users with an employee record are managed through the employee endpoints.
#[utoipa::path(
    put,
    path = "/update-role",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = UpdateRoleReq,
    responses(
        (status = 200, description = "Updated role successfully", body = StdResponse<PublicUser, String>),
        (status = 409, description = "User has an employee record")
    )
)]
async fn update_role(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateRoleReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    body.validate()?;
    let restaurant_id = user.bound_restaurant()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let target: UserEntity = users::table
        .filter(users::email.eq(body.email.trim().to_lowercase()))
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to look up user")?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if target.restaurant_id.is_some_and(|id| id != restaurant_id) {
        return Err(AppError::Forbidden(
            "Not authorized to update this user's role".into(),
        ));
    }

    let employee_id: Option<i32> = employees::table
        .filter(employees::user_id.eq(target.id))
        .select(employees::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to look up employee record")?;
    if employee_id.is_some() {
        return Err(AppError::Conflict(
            "User is an employee, change their role through the employee endpoints".into(),
        ));
    }

    let role = target.role.apply(RoleChange::Reassign(body.new_role))?;
    let updated: UserEntity = diesel::update(users::table.find(target.id))
        .set((
            users::role.eq(role),
            users::restaurant_id.eq(role.binding(restaurant_id)),
        ))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(
        user_id = updated.id,
        role = %updated.role,
        restaurant_id,
        "Reassigned user role"
    );

    Ok(StdResponse {
        message: Some(format!("User {}'s role updated to {}", updated.email, role)),
        data: Some(PublicUser::from(updated)),
    })
}
