use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, require_auth},
    domain::{
        booking::{BookingFilter, BookingStatus, DateBound},
        role::Role,
    },
    models::{BookingStatusChange, CreateTableBookingEntity, TableBookingEntity},
    routes::restaurants::find_owned_restaurant,
    schema::{restaurants, table_bookings},
    validation::provided,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_booking))
            .routes(utoipa_axum::routes!(get_customer_bookings))
            .routes(utoipa_axum::routes!(get_restaurant_bookings))
            .routes(utoipa_axum::routes!(update_booking_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
    )
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateBookingReq {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Display time, kept as given.
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub time: String,
    #[validate(range(min = 1))]
    pub guests: i32,
}

/// Book a table for the caller at the booking restaurant.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    request_body = CreateBookingReq,
    responses(
        (status = 201, description = "Created booking successfully", body = StdResponse<TableBookingEntity, String>)
    )
)]
async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBookingReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let restaurant_id: i32 = restaurants::table
        .find(state.booking_restaurant_id)
        .select(restaurants::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to get booking restaurant")?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))?;

    let booking: TableBookingEntity = diesel::insert_into(table_bookings::table)
        .values(CreateTableBookingEntity {
            restaurant_id,
            customer_id: user.id,
            booking_date: body.date,
            booking_time: body.time.trim().to_owned(),
            guests: body.guests,
            status: BookingStatus::Pending,
        })
        .returning(TableBookingEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(
        booking_id = booking.id,
        restaurant_id,
        customer_id = user.id,
        "Created booking"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(booking),
            message: Some("Created booking successfully"),
        },
    ))
}

/// List a customer's own bookings, latest date first.
#[utoipa::path(
    get,
    path = "/customer/{customer_id}",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("customer_id" = i32, Path, description = "Customer's user ID")
    ),
    responses(
        (status = 200, description = "Get bookings successfully", body = StdResponse<Vec<TableBookingEntity>, String>),
        (status = 403, description = "Bookings belong to another customer")
    )
)]
async fn get_customer_bookings(
    Path(customer_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    if user.id != customer_id {
        tracing::warn!(user_id = user.id, customer_id, "Denied access to bookings");
        return Err(AppError::Forbidden(
            "Not authorized to view these bookings".into(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let bookings: Vec<TableBookingEntity> = table_bookings::table
        .filter(table_bookings::customer_id.eq(customer_id))
        .select(TableBookingEntity::as_select())
        .order_by((
            table_bookings::booking_date.desc(),
            table_bookings::booking_time.desc(),
        ))
        .get_results(conn)
        .await
        .context("Failed to get bookings")?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get bookings successfully"),
    })
}

#[derive(Deserialize, IntoParams)]
pub struct RestaurantBookingsQuery {
    /// `upcoming`, `past` or `all` (default).
    pub filter: Option<BookingFilter>,
}

/// List a restaurant's bookings in date and time order.
#[utoipa::path(
    get,
    path = "/restaurant/{restaurant_id}",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        RestaurantBookingsQuery
    ),
    responses(
        (status = 200, description = "Get bookings successfully", body = StdResponse<Vec<TableBookingEntity>, String>)
    )
)]
async fn get_restaurant_bookings(
    Path(restaurant_id): Path<i32>,
    Query(query): Query<RestaurantBookingsQuery>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    find_owned_restaurant(conn, restaurant_id, user.id, "view these bookings").await?;

    let mut statement = table_bookings::table
        .filter(table_bookings::restaurant_id.eq(restaurant_id))
        .select(TableBookingEntity::as_select())
        .order_by((
            table_bookings::booking_date.asc(),
            table_bookings::booking_time.asc(),
        ))
        .into_boxed();
    let today = Utc::now().date_naive();
    match query.filter.and_then(|filter| filter.bound(today)) {
        Some(DateBound::OnOrAfter(from)) => {
            statement = statement.filter(table_bookings::booking_date.ge(from));
        }
        Some(DateBound::Before(until)) => {
            statement = statement.filter(table_bookings::booking_date.lt(until));
        }
        None => {}
    }

    let bookings: Vec<TableBookingEntity> = statement
        .get_results(conn)
        .await
        .context("Failed to get bookings")?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get bookings successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBookingStatusReq {
    pub status: BookingStatus,
    /// Table to seat the party at. Left unchanged when omitted.
    pub table_number: Option<String>,
}

/// Set a booking's status. Any status may follow any other.
#[utoipa::path(
    put,
    path = "/{booking_id}/update-status",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("booking_id" = i32, Path, description = "Booking ID")
    ),
    request_body = UpdateBookingStatusReq,
    responses(
        (status = 200, description = "Updated booking successfully", body = StdResponse<TableBookingEntity, String>)
    )
)]
async fn update_booking_status(
    Path(booking_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateBookingStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Admin])?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let restaurant_id: i32 = table_bookings::table
        .find(booking_id)
        .select(table_bookings::restaurant_id)
        .first(conn)
        .await
        .optional()
        .context("Failed to get booking")?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    find_owned_restaurant(conn, restaurant_id, user.id, "update this booking").await?;

    let booking: TableBookingEntity = diesel::update(table_bookings::table.find(booking_id))
        .set(&BookingStatusChange {
            status: body.status,
            table_number: provided(body.table_number),
        })
        .returning(TableBookingEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(
        booking_id,
        status = %booking.status,
        "Updated booking status"
    );

    Ok(StdResponse {
        data: Some(booking),
        message: Some("Updated booking successfully"),
    })
}
