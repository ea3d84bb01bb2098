use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::role::{Role, RoleChange},
    models::{
        CreateMenuItemEntity, CreateRestaurantEntity, RestaurantEntity, UpdateRestaurantEntity,
        UserEntity,
    },
    routes::menu::MenuItemReq,
    schema::{menu_items, restaurants, users},
    validation::provided,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(utoipa_axum::routes!(list_restaurants));

    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(register_restaurant))
        .routes(utoipa_axum::routes!(get_restaurant_by_owner))
        .routes(utoipa_axum::routes!(update_restaurant))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    utoipa_axum::router::OpenApiRouter::new().nest("/restaurants", public.merge(protected))
}

/// Loads a restaurant and checks that `caller_id` owns it.
///
/// `NotFound` when the restaurant does not exist, `Forbidden` with
/// "Not authorized to {action}" otherwise.
pub(crate) async fn find_owned_restaurant(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    caller_id: i32,
    action: &str,
) -> Result<RestaurantEntity, AppError> {
    let restaurant: RestaurantEntity = restaurants::table
        .find(restaurant_id)
        .select(RestaurantEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get restaurant")?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))?;

    if restaurant.owner_id != caller_id {
        tracing::warn!(
            user_id = caller_id,
            restaurant_id,
            "Caller does not own restaurant"
        );
        return Err(AppError::Forbidden(format!("Not authorized to {action}")));
    }

    Ok(restaurant)
}

/// List every restaurant.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Restaurants"],
    responses(
        (status = 200, description = "Get restaurants successfully", body = StdResponse<Vec<RestaurantEntity>, String>)
    )
)]
async fn list_restaurants(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let restaurants: Vec<RestaurantEntity> = restaurants::table
        .select(RestaurantEntity::as_select())
        .order(restaurants::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get restaurants")?;

    Ok(StdResponse {
        data: Some(restaurants),
        message: Some("Get restaurants successfully"),
    })
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterRestaurantReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub name: String,
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub address: String,
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub phone: String,
    pub tax_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub menu: Vec<MenuItemReq>,
}

/// Register a restaurant owned by the caller.
///
/// The caller becomes the restaurant's admin. Any initial menu items are
/// created with it.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Restaurants"],
    security(("bearerAuth" = [])),
    request_body = RegisterRestaurantReq,
    responses(
        (status = 201, description = "Registered restaurant successfully", body = StdResponse<RestaurantEntity, String>),
        (status = 409, description = "Owner, name or tax id already registered")
    )
)]
async fn register_restaurant(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<RegisterRestaurantReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let owner_id = user.id;
    let restaurant = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let owned: Option<i32> = restaurants::table
                    .filter(restaurants::owner_id.eq(owner_id))
                    .select(restaurants::id)
                    .first(conn)
                    .await
                    .optional()?;
                if owned.is_some() {
                    return Err(AppError::Conflict(
                        "You have already registered a restaurant.".into(),
                    ));
                }

                let owner: UserEntity = users::table
                    .find(owner_id)
                    .select(UserEntity::as_select())
                    .first(conn)
                    .await?;
                let role = owner.role.apply(RoleChange::RegisterRestaurant)?;

                let name = body.name.trim().to_owned();
                let name_taken: Option<i32> = restaurants::table
                    .filter(restaurants::name.eq(&name))
                    .select(restaurants::id)
                    .first(conn)
                    .await
                    .optional()?;
                if name_taken.is_some() {
                    return Err(AppError::Conflict("Restaurant name already taken.".into()));
                }

                let tax_id = provided(body.tax_id);
                if let Some(tax_id) = &tax_id {
                    let tax_taken: Option<i32> = restaurants::table
                        .filter(restaurants::tax_id.eq(tax_id))
                        .select(restaurants::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if tax_taken.is_some() {
                        return Err(AppError::Conflict("Tax id already registered.".into()));
                    }
                }

                let restaurant: RestaurantEntity = diesel::insert_into(restaurants::table)
                    .values(CreateRestaurantEntity {
                        name,
                        address: body.address,
                        phone: body.phone,
                        tax_id,
                        owner_id,
                    })
                    .returning(RestaurantEntity::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::update(users::table.find(owner_id))
                    .set((
                        users::role.eq(role),
                        users::restaurant_id.eq(role.binding(restaurant.id)),
                    ))
                    .execute(conn)
                    .await?;

                if !body.menu.is_empty() {
                    let items: Vec<CreateMenuItemEntity> = body
                        .menu
                        .into_iter()
                        .map(|item| item.into_entity(restaurant.id))
                        .collect();
                    diesel::insert_into(menu_items::table)
                        .values(&items)
                        .execute(conn)
                        .await?;
                }

                Ok::<_, AppError>(restaurant)
            })
        })
        .await?;

    tracing::info!(
        restaurant_id = restaurant.id,
        owner_id,
        "Registered restaurant"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(restaurant),
            message: Some("Registered restaurant successfully"),
        },
    ))
}

/// Get the restaurant owned by a user.
#[utoipa::path(
    get,
    path = "/admin/{user_id}",
    tags = ["Restaurants"],
    security(("bearerAuth" = [])),
    params(
        ("user_id" = i32, Path, description = "Owner's user ID")
    ),
    responses(
        (status = 200, description = "Get restaurant successfully", body = StdResponse<RestaurantEntity, String>),
        (status = 404, description = "The user owns no restaurant")
    )
)]
async fn get_restaurant_by_owner(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let restaurant: RestaurantEntity = restaurants::table
        .filter(restaurants::owner_id.eq(user_id))
        .select(RestaurantEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get restaurant")?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))?;

    Ok(StdResponse {
        data: Some(restaurant),
        message: Some("Get restaurant successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRestaurantReq {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

/// Update the caller's restaurant. Empty fields are ignored.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Restaurants"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Restaurant ID")
    ),
    request_body = UpdateRestaurantReq,
    responses(
        (status = 200, description = "Updated restaurant successfully", body = StdResponse<RestaurantEntity, String>)
    )
)]
async fn update_restaurant(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateRestaurantReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let restaurant = find_owned_restaurant(conn, id, user.id, "update this restaurant").await?;

    let patch = UpdateRestaurantEntity {
        name: provided(body.name).map(|name| name.trim().to_owned()),
        address: provided(body.address),
        phone: provided(body.phone),
        tax_id: provided(body.tax_id),
    };

    let restaurant = if patch.is_empty() {
        restaurant
    } else {
        diesel::update(restaurants::table.find(id))
            .set(&patch)
            .returning(RestaurantEntity::as_returning())
            .get_result(conn)
            .await?
    };

    tracing::info!(restaurant_id = id, "Updated restaurant");

    Ok(StdResponse {
        data: Some(restaurant),
        message: Some("Updated restaurant successfully"),
    })
}
