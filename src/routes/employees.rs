use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, password, require_auth},
    domain::role::{Role, RoleChange, StaffRole},
    models::{
        CreateEmployeeEntity, CreateUserEntity, EmployeeEntity, UpdateEmployeeEntity,
        UpdateLinkedUserEntity, UserEntity,
    },
    routes::restaurants::find_owned_restaurant,
    schema::{employees, users},
    validation::provided,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/employees",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_employees))
            .routes(utoipa_axum::routes!(add_employee))
            .routes(utoipa_axum::routes!(update_employee, delete_employee))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
    )
}

/// An employee record together with its linked account's email.
#[derive(Serialize, ToSchema)]
pub struct EmployeeRes {
    #[serde(flatten)]
    pub employee: EmployeeEntity,
    pub email: String,
}

/// Loads an employee and checks it works at `restaurant_id`.
async fn find_scoped_employee(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    employee_id: i32,
) -> Result<EmployeeEntity, AppError> {
    let employee: EmployeeEntity = employees::table
        .find(employee_id)
        .select(EmployeeEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    if employee.restaurant_id != restaurant_id {
        return Err(AppError::BadRequest(
            "Employee does not belong to this restaurant".into(),
        ));
    }

    Ok(employee)
}

/// List a restaurant's employees.
#[utoipa::path(
    get,
    path = "/{restaurant_id}",
    tags = ["Employees"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Get employees successfully", body = StdResponse<Vec<EmployeeRes>, String>)
    )
)]
async fn list_employees(
    Path(restaurant_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "view these employees").await?;

    let rows: Vec<(EmployeeEntity, String)> = employees::table
        .inner_join(users::table)
        .filter(employees::restaurant_id.eq(restaurant_id))
        .select((EmployeeEntity::as_select(), users::email))
        .order(employees::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get employees")?;

    let employees: Vec<EmployeeRes> = rows
        .into_iter()
        .map(|(employee, email)| EmployeeRes { employee, email })
        .collect();

    Ok(StdResponse {
        data: Some(employees),
        message: Some("Get employees successfully"),
    })
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct AddEmployeeReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Required only when no account exists for `email`.
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub role: StaffRole,
    #[validate(range(min = 0))]
    pub age: Option<i32>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub salary: Option<Decimal>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub bonus: Option<Decimal>,
    #[serde(default)]
    pub image: String,
}

/// Add an employee to the caller's restaurant.
///
/// An existing account with the same email is re-linked to this restaurant,
/// leaving any previous restaurant. Otherwise a new account is created.
#[utoipa::path(
    post,
    path = "/{restaurant_id}/add",
    tags = ["Employees"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    request_body = AddEmployeeReq,
    responses(
        (status = 201, description = "Added employee successfully", body = StdResponse<EmployeeRes, String>),
        (status = 409, description = "User is already an employee of this restaurant")
    )
)]
async fn add_employee(
    Path(restaurant_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<AddEmployeeReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "add employees").await?;

    let email = body.email.trim().to_lowercase();
    let password_hash = body
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let employee = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let existing: Option<UserEntity> = users::table
                    .filter(users::email.eq(&email))
                    .select(UserEntity::as_select())
                    .first(conn)
                    .await
                    .optional()?;

                let linked: UserEntity = match existing {
                    Some(existing) => {
                        let current: Option<EmployeeEntity> = employees::table
                            .filter(employees::user_id.eq(existing.id))
                            .select(EmployeeEntity::as_select())
                            .first(conn)
                            .await
                            .optional()?;

                        if let Some(current) = current {
                            if current.restaurant_id == restaurant_id {
                                return Err(AppError::Conflict(
                                    "User is already an employee of this restaurant.".into(),
                                ));
                            }
                            diesel::delete(employees::table.find(current.id))
                                .execute(conn)
                                .await?;
                            tracing::info!(
                                user_id = existing.id,
                                from_restaurant_id = current.restaurant_id,
                                "Re-linking employee from another restaurant"
                            );
                        }

                        let role = existing.role.apply(RoleChange::Hire(body.role))?;
                        diesel::update(users::table.find(existing.id))
                            .set((
                                users::role.eq(role),
                                users::restaurant_id.eq(role.binding(restaurant_id)),
                            ))
                            .returning(UserEntity::as_returning())
                            .get_result(conn)
                            .await?
                    }
                    None => {
                        let password_hash = password_hash.ok_or_else(|| {
                            AppError::BadRequest("Password is required for a new employee".into())
                        })?;
                        let role = Role::from(body.role);
                        diesel::insert_into(users::table)
                            .values(CreateUserEntity {
                                name: body.name.clone(),
                                email,
                                password_hash,
                                phone: None,
                                role,
                                restaurant_id: role.binding(restaurant_id),
                            })
                            .returning(UserEntity::as_returning())
                            .get_result(conn)
                            .await?
                    }
                };

                let employee: EmployeeEntity = diesel::insert_into(employees::table)
                    .values(CreateEmployeeEntity {
                        user_id: linked.id,
                        restaurant_id,
                        name: body.name,
                        age: body.age,
                        salary: body.salary,
                        bonus: body.bonus.unwrap_or_default(),
                        role: body.role,
                        image: body.image,
                    })
                    .returning(EmployeeEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<_, AppError>(EmployeeRes {
                    employee,
                    email: linked.email,
                })
            })
        })
        .await?;

    tracing::info!(
        restaurant_id,
        employee_id = employee.employee.id,
        user_id = employee.employee.user_id,
        "Added employee"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(employee),
            message: Some("Added employee successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct UpdateEmployeeReq {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub role: Option<StaffRole>,
    #[validate(range(min = 0))]
    pub age: Option<i32>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub salary: Option<Decimal>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub bonus: Option<Decimal>,
    pub image: Option<String>,
}

/// Update an employee. Email, role and password changes are applied to the
/// linked account as well.
#[utoipa::path(
    put,
    path = "/{restaurant_id}/{employee_id}",
    tags = ["Employees"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        ("employee_id" = i32, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployeeReq,
    responses(
        (status = 200, description = "Updated employee successfully", body = StdResponse<EmployeeRes, String>),
        (status = 400, description = "Employee belongs to another restaurant")
    )
)]
async fn update_employee(
    Path((restaurant_id, employee_id)): Path<(i32, i32)>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateEmployeeReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "update employees").await?;

    let password_hash = provided(body.password)
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let employee = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let employee = find_scoped_employee(conn, restaurant_id, employee_id).await?;
                let linked: UserEntity = users::table
                    .find(employee.user_id)
                    .select(UserEntity::as_select())
                    .first(conn)
                    .await?;

                let role = body
                    .role
                    .map(|staff| linked.role.apply(RoleChange::Hire(staff)))
                    .transpose()?;
                let user_patch = UpdateLinkedUserEntity {
                    email: provided(body.email).map(|email| email.trim().to_lowercase()),
                    role,
                    restaurant_id: role.map(|role| role.binding(restaurant_id)),
                    password_hash,
                };
                let email = if user_patch.is_empty() {
                    linked.email
                } else {
                    diesel::update(users::table.find(linked.id))
                        .set(&user_patch)
                        .returning(users::email)
                        .get_result(conn)
                        .await?
                };

                let patch = UpdateEmployeeEntity {
                    name: provided(body.name),
                    age: body.age,
                    salary: body.salary,
                    bonus: body.bonus,
                    role: body.role,
                    image: provided(body.image),
                };
                let employee = if patch.is_empty() {
                    employee
                } else {
                    diesel::update(employees::table.find(employee_id))
                        .set(&patch)
                        .returning(EmployeeEntity::as_returning())
                        .get_result(conn)
                        .await?
                };

                Ok::<_, AppError>(EmployeeRes { employee, email })
            })
        })
        .await?;

    tracing::info!(restaurant_id, employee_id, "Updated employee");

    Ok(StdResponse {
        data: Some(employee),
        message: Some("Updated employee successfully"),
    })
}

/// Remove an employee. The linked account becomes a customer again.
#[utoipa::path(
    delete,
    path = "/{restaurant_id}/{employee_id}",
    tags = ["Employees"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        ("employee_id" = i32, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Deleted employee successfully", body = StdResponse<EmployeeEntity, String>),
        (status = 400, description = "Employee belongs to another restaurant")
    )
)]
async fn delete_employee(
    Path((restaurant_id, employee_id)): Path<(i32, i32)>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "remove employees").await?;

    let employee = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let employee = find_scoped_employee(conn, restaurant_id, employee_id).await?;
                let linked: UserEntity = users::table
                    .find(employee.user_id)
                    .select(UserEntity::as_select())
                    .first(conn)
                    .await?;

                let role = linked.role.apply(RoleChange::Dismiss)?;
                diesel::update(users::table.find(linked.id))
                    .set((users::role.eq(role), users::restaurant_id.eq(None::<i32>)))
                    .execute(conn)
                    .await?;

                diesel::delete(employees::table.find(employee.id))
                    .execute(conn)
                    .await?;

                Ok::<_, AppError>(employee)
            })
        })
        .await?;

    tracing::info!(
        restaurant_id,
        employee_id,
        user_id = employee.user_id,
        "Deleted employee"
    );

    Ok(StdResponse {
        data: Some(employee),
        message: Some("Deleted employee successfully"),
    })
}
