use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::{
        order::{OrderStatus, authorize_status_change, order_total, served_at_for},
        role::Role,
    },
    models::{
        CreateOrderEntity, CreateOrderItemEntity, MenuItemEntity, OrderEntity, OrderItemEntity,
        OrderStatusChange,
    },
    schema::{menu_items, order_items, orders},
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order, get_orders))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
    )
}

#[derive(Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

#[derive(Serialize, Deserialize, ToSchema, Validate)]
pub struct OrderLineReq {
    pub menu_item_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateOrderReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub table_number: String,
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "Order must contain at least one item"), nested)]
    pub items: Vec<OrderLineReq>,
}

/// Place an order at a restaurant.
///
/// Names and prices are copied from the menu at this instant.
#[utoipa::path(
    post,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Restaurant ID")
    ),
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<OrderWithItems, String>),
        (status = 404, description = "A menu item is not on this restaurant's menu")
    )
)]
async fn create_order(
    Path(restaurant_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Waiter, Role::Admin])?;
    user.require_restaurant(restaurant_id, "create orders for this restaurant")?;
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let requested: Vec<i32> = body.items.iter().map(|line| line.menu_item_id).collect();
    let menu: HashMap<i32, MenuItemEntity> = menu_items::table
        .filter(menu_items::id.eq_any(&requested))
        .filter(menu_items::restaurant_id.eq(restaurant_id))
        .select(MenuItemEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get menu items")?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let mut lines = Vec::with_capacity(body.items.len());
    for line in &body.items {
        let item = menu.get(&line.menu_item_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Menu item not found or does not belong to this restaurant: {}",
                line.menu_item_id
            ))
        })?;
        lines.push((item, line.quantity));
    }

    let total_amount = order_total(lines.iter().map(|(item, quantity)| (item.price, *quantity)));
    let snapshot: Vec<(i32, String, Decimal, i32)> = lines
        .into_iter()
        .map(|(item, quantity)| (item.id, item.name.clone(), item.price, quantity))
        .collect();

    let created_by = user.id;
    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        restaurant_id,
                        table_number: body.table_number.trim().to_owned(),
                        customer_name: body.customer_name.trim().to_owned(),
                        status: OrderStatus::Pending,
                        total_amount,
                        created_by: Some(created_by),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let rows: Vec<CreateOrderItemEntity> = snapshot
                    .into_iter()
                    .map(|(menu_item_id, name, price, quantity)| CreateOrderItemEntity {
                        order_id: order.id,
                        menu_item_id,
                        name,
                        price,
                        quantity,
                    })
                    .collect();
                let items: Vec<OrderItemEntity> = diesel::insert_into(order_items::table)
                    .values(&rows)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await?;

                Ok::<_, AppError>(OrderWithItems { order, items })
            })
        })
        .await?;

    tracing::info!(
        restaurant_id,
        order_id = order.order.id,
        total_amount = %order.order.total_amount,
        "Created order"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Created order successfully"),
        },
    ))
}

#[derive(Deserialize, IntoParams)]
pub struct OrdersQuery {
    /// Only orders currently in this status.
    pub status: Option<OrderStatus>,
}

/// List a restaurant's orders, newest first.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Restaurant ID"),
        OrdersQuery
    ),
    responses(
        (status = 200, description = "Get orders successfully", body = StdResponse<Vec<OrderWithItems>, String>)
    )
)]
async fn get_orders(
    Path(restaurant_id): Path<i32>,
    Query(query): Query<OrdersQuery>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Waiter, Role::Chef, Role::Admin])?;
    user.require_restaurant(restaurant_id, "view orders for this restaurant")?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut statement = orders::table
        .filter(orders::restaurant_id.eq(restaurant_id))
        .select(OrderEntity::as_select())
        .order_by((orders::created_at.desc(), orders::id.desc()))
        .into_boxed();
    if let Some(status) = query.status {
        statement = statement.filter(orders::status.eq(status));
    }

    let orders: Vec<OrderEntity> = statement
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .select(OrderItemEntity::as_select())
        .order_by(order_items::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<OrderWithItems> = orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateOrderStatusReq {
    pub status: OrderStatus,
}

/// Move an order to a new status.
///
/// Chefs may only set `preparing` or `ready`. Setting `served` stamps
/// `served_at`.
#[utoipa::path(
    put,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<OrderEntity, String>),
        (status = 403, description = "The caller's role may not set this status")
    )
)]
async fn update_order_status(
    Path(order_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Waiter, Role::Chef, Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(order_id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    user.require_restaurant(order.restaurant_id, "update orders for this restaurant")?;
    authorize_status_change(user.role, body.status)?;

    let order: OrderEntity = diesel::update(orders::table.find(order_id))
        .set(&OrderStatusChange {
            status: body.status,
            served_at: served_at_for(body.status, Utc::now()),
        })
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(
        order_id,
        status = %order.status,
        user_id = user.id,
        "Updated order status"
    );

    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated order status successfully"),
    })
}
