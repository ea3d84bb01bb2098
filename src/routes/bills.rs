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

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::{
        billing::{BillTotals, HistoryFilter},
        order::OrderStatus,
        role::Role,
    },
    models::{
        BillEntity, BillItemEntity, CreateBillEntity, CreateBillItemEntity, OrderEntity,
        OrderItemEntity,
    },
    schema::{bill_items, bills, order_items, orders},
};

const BILLING_ROLES: &[Role] = &[Role::Cashier, Role::Admin];

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/bills",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(generate_bill_from_order))
            .routes(utoipa_axum::routes!(get_bill))
            .routes(utoipa_axum::routes!(get_bill_history))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
    )
}

#[derive(Serialize, ToSchema)]
pub struct BillWithItems {
    pub bill: BillEntity,
    pub items: Vec<BillItemEntity>,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateBillReq {
    /// Defaults to 18 when omitted. Zero is a valid rate.
    #[serde(default)]
    pub gst_percentage: Option<Decimal>,
}

/// Generate the bill for an order.
///
/// An order is billed at most once. The order is marked `billed`.
#[utoipa::path(
    post,
    path = "/generate-from-order/{order_id}",
    tags = ["Bills"],
    security(("bearerAuth" = [])),
    params(
        ("order_id" = i32, Path, description = "Order ID")
    ),
    request_body = GenerateBillReq,
    responses(
        (status = 201, description = "Generated bill successfully", body = StdResponse<BillWithItems, String>),
        (status = 409, description = "Bill already generated for this order")
    )
)]
async fn generate_bill_from_order(
    Path(order_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<GenerateBillReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(BILLING_ROLES)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let generated_by = user.id;
    let bill = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(order_id)
                    .select(OrderEntity::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

                user.require_restaurant(order.restaurant_id, "bill orders for this restaurant")?;

                let billed: Option<i32> = bills::table
                    .filter(bills::order_id.eq(order.id))
                    .select(bills::id)
                    .first(conn)
                    .await
                    .optional()?;
                if billed.is_some() {
                    return Err(AppError::Conflict(
                        "Bill already generated for this order".into(),
                    ));
                }

                let totals = BillTotals::compute(order.total_amount, body.gst_percentage)?;

                let bill: BillEntity = diesel::insert_into(bills::table)
                    .values(CreateBillEntity {
                        restaurant_id: order.restaurant_id,
                        order_id: Some(order.id),
                        table_number: order.table_number,
                        customer_name: order.customer_name,
                        total_without_tax: totals.total_without_tax,
                        gst_percentage: totals.gst_percentage,
                        total_amount: totals.total_amount,
                        generated_by: Some(generated_by),
                    })
                    .returning(BillEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let lines: Vec<OrderItemEntity> = order_items::table
                    .filter(order_items::order_id.eq(order.id))
                    .select(OrderItemEntity::as_select())
                    .order_by(order_items::id.asc())
                    .get_results(conn)
                    .await?;
                let rows: Vec<CreateBillItemEntity> = lines
                    .into_iter()
                    .map(|line| CreateBillItemEntity {
                        bill_id: bill.id,
                        menu_item_id: line.menu_item_id,
                        name: line.name,
                        price: line.price,
                        quantity: line.quantity,
                    })
                    .collect();
                let items: Vec<BillItemEntity> = if rows.is_empty() {
                    Vec::new()
                } else {
                    diesel::insert_into(bill_items::table)
                        .values(&rows)
                        .returning(BillItemEntity::as_returning())
                        .get_results(conn)
                        .await?
                };

                diesel::update(orders::table.find(order.id))
                    .set(orders::status.eq(OrderStatus::Billed))
                    .execute(conn)
                    .await?;

                Ok::<_, AppError>(BillWithItems { bill, items })
            })
        })
        .await?;

    tracing::info!(
        order_id,
        bill_id = bill.bill.id,
        total_amount = %bill.bill.total_amount,
        "Generated bill"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(bill),
            message: Some("Generated bill successfully"),
        },
    ))
}

/// Fetch a bill with its items.
#[utoipa::path(
    get,
    path = "/{bill_id}",
    tags = ["Bills"],
    security(("bearerAuth" = [])),
    params(
        ("bill_id" = i32, Path, description = "Bill ID")
    ),
    responses(
        (status = 200, description = "Get bill successfully", body = StdResponse<BillWithItems, String>)
    )
)]
async fn get_bill(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(BILLING_ROLES)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let bill: BillEntity = bills::table
        .find(bill_id)
        .select(BillEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get bill")?
        .ok_or_else(|| AppError::NotFound("Bill not found".into()))?;

    user.require_restaurant(bill.restaurant_id, "view bills for this restaurant")?;

    let items: Vec<BillItemEntity> = bill_items::table
        .filter(bill_items::bill_id.eq(bill.id))
        .select(BillItemEntity::as_select())
        .order_by(bill_items::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get bill items")?;

    Ok(StdResponse {
        data: Some(BillWithItems { bill, items }),
        message: Some("Get bill successfully"),
    })
}

#[derive(Deserialize, IntoParams)]
pub struct BillHistoryQuery {
    /// Time window; all bills when omitted.
    pub filter: Option<HistoryFilter>,
}

/// List a restaurant's bills, newest first.
#[utoipa::path(
    get,
    path = "/restaurant/{restaurant_id}",
    tags = ["Bills"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        BillHistoryQuery
    ),
    responses(
        (status = 200, description = "Get bill history successfully", body = StdResponse<Vec<BillWithItems>, String>)
    )
)]
async fn get_bill_history(
    Path(restaurant_id): Path<i32>,
    Query(query): Query<BillHistoryQuery>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(BILLING_ROLES)?;
    user.require_restaurant(restaurant_id, "view bills for this restaurant")?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut statement = bills::table
        .filter(bills::restaurant_id.eq(restaurant_id))
        .select(BillEntity::as_select())
        .order_by((bills::created_at.desc(), bills::id.desc()))
        .into_boxed();
    if let Some(start) = query
        .filter
        .unwrap_or(HistoryFilter::All)
        .start(Utc::now())
    {
        statement = statement.filter(bills::created_at.ge(start));
    }

    let bills: Vec<BillEntity> = statement
        .get_results(conn)
        .await
        .context("Failed to get bills")?;

    let bill_ids: Vec<i32> = bills.iter().map(|bill| bill.id).collect();
    let items: Vec<BillItemEntity> = bill_items::table
        .filter(bill_items::bill_id.eq_any(&bill_ids))
        .select(BillItemEntity::as_select())
        .order_by(bill_items::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get bill items")?;

    let mut group: HashMap<i32, Vec<BillItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.bill_id).or_default().push(item);
    }

    let bills_with_items: Vec<BillWithItems> = bills
        .into_iter()
        .map(|bill| BillWithItems {
            items: group.remove(&bill.id).unwrap_or_default(),
            bill,
        })
        .collect();

    Ok(StdResponse {
        data: Some(bills_with_items),
        message: Some("Get bill history successfully"),
    })
}
