use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::role::Role,
    models::{CreateMenuItemEntity, MenuItemEntity, UpdateMenuItemEntity},
    routes::restaurants::find_owned_restaurant,
    schema::menu_items,
    validation::provided,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(utoipa_axum::routes!(list_menu));

    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(add_menu_item))
        .routes(utoipa_axum::routes!(update_menu_item, delete_menu_item))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    utoipa_axum::router::OpenApiRouter::new().nest("/menu", public.merge(protected))
}

#[derive(Deserialize, ToSchema, Validate, Debug)]
pub struct MenuItemReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub price: Decimal,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub review: String,
}

impl MenuItemReq {
    pub fn into_entity(self, restaurant_id: i32) -> CreateMenuItemEntity {
        CreateMenuItemEntity {
            restaurant_id,
            name: self.name.trim().to_owned(),
            description: self.description,
            price: self.price,
            photo: self.photo,
            review: self.review,
        }
    }
}

/// Loads a menu item and checks it is listed under `restaurant_id`.
async fn find_scoped_item(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    menu_item_id: i32,
) -> Result<MenuItemEntity, AppError> {
    let item: MenuItemEntity = menu_items::table
        .find(menu_item_id)
        .select(MenuItemEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get menu item")?
        .ok_or_else(|| AppError::NotFound("Menu item not found".into()))?;

    if item.restaurant_id != restaurant_id {
        return Err(AppError::BadRequest(
            "Menu item does not belong to this restaurant".into(),
        ));
    }

    Ok(item)
}

/// List a restaurant's menu.
#[utoipa::path(
    get,
    path = "/{restaurant_id}",
    tags = ["Menu"],
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Get menu successfully", body = StdResponse<Vec<MenuItemEntity>, String>)
    )
)]
async fn list_menu(
    Path(restaurant_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let items: Vec<MenuItemEntity> = menu_items::table
        .filter(menu_items::restaurant_id.eq(restaurant_id))
        .select(MenuItemEntity::as_select())
        .order(menu_items::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get menu items")?;

    Ok(StdResponse {
        data: Some(items),
        message: Some("Get menu successfully"),
    })
}

/// Add an item to the caller's restaurant menu.
#[utoipa::path(
    post,
    path = "/{restaurant_id}/add",
    tags = ["Menu"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    request_body = MenuItemReq,
    responses(
        (status = 201, description = "Added menu item successfully", body = StdResponse<MenuItemEntity, String>)
    )
)]
async fn add_menu_item(
    Path(restaurant_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<MenuItemReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "manage this menu").await?;

    let item: MenuItemEntity = diesel::insert_into(menu_items::table)
        .values(body.into_entity(restaurant_id))
        .returning(MenuItemEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(restaurant_id, menu_item_id = item.id, "Added menu item");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(item),
            message: Some("Added menu item successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct UpdateMenuItemReq {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub price: Option<Decimal>,
    pub photo: Option<String>,
    pub review: Option<String>,
}

/// Update a menu item. Empty fields are ignored.
#[utoipa::path(
    put,
    path = "/{restaurant_id}/{menu_item_id}",
    tags = ["Menu"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        ("menu_item_id" = i32, Path, description = "Menu item ID")
    ),
    request_body = UpdateMenuItemReq,
    responses(
        (status = 200, description = "Updated menu item successfully", body = StdResponse<MenuItemEntity, String>),
        (status = 400, description = "Menu item belongs to another restaurant")
    )
)]
async fn update_menu_item(
    Path((restaurant_id, menu_item_id)): Path<(i32, i32)>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateMenuItemReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "manage this menu").await?;
    let item = find_scoped_item(conn, restaurant_id, menu_item_id).await?;

    let patch = UpdateMenuItemEntity {
        name: provided(body.name).map(|name| name.trim().to_owned()),
        description: provided(body.description),
        price: body.price,
        photo: provided(body.photo),
        review: provided(body.review),
    };

    let item = if patch.is_empty() {
        item
    } else {
        diesel::update(menu_items::table.find(menu_item_id))
            .set(&patch)
            .returning(MenuItemEntity::as_returning())
            .get_result(conn)
            .await?
    };

    tracing::info!(restaurant_id, menu_item_id, "Updated menu item");

    Ok(StdResponse {
        data: Some(item),
        message: Some("Updated menu item successfully"),
    })
}

/// Remove a menu item. Existing orders keep their snapshots.
#[utoipa::path(
    delete,
    path = "/{restaurant_id}/{menu_item_id}",
    tags = ["Menu"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        ("menu_item_id" = i32, Path, description = "Menu item ID")
    ),
    responses(
        (status = 200, description = "Deleted menu item successfully", body = StdResponse<MenuItemEntity, String>),
        (status = 400, description = "Menu item belongs to another restaurant")
    )
)]
async fn delete_menu_item(
    Path((restaurant_id, menu_item_id)): Path<(i32, i32)>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "manage this menu").await?;
    find_scoped_item(conn, restaurant_id, menu_item_id).await?;

    let item: MenuItemEntity = diesel::delete(menu_items::table.find(menu_item_id))
        .returning(MenuItemEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(restaurant_id, menu_item_id, "Deleted menu item");

    Ok(StdResponse {
        data: Some(item),
        message: Some("Deleted menu item successfully"),
    })
}
