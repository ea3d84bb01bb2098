use anyhow::Context;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use diesel::SelectableHelper;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{CreatePaymentEntity, PaymentEntity},
    schema::payments,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new().routes(utoipa_axum::routes!(record_payment)),
    )
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct RecordPaymentReq {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub method: String,
    /// Gateway payload, stored as given.
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    #[validate(custom(function = "crate::validation::non_negative"))]
    pub amount: Decimal,
}

/// Record a payment attempt in the audit log.
///
/// Payments are not linked to orders or bills.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Payments"],
    request_body = RecordPaymentReq,
    responses(
        (status = 201, description = "Payment stored successfully", body = StdResponse<PaymentEntity, String>),
        (status = 400, description = "Invalid payment payload")
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Json(body): Json<RecordPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let payment: PaymentEntity = diesel::insert_into(payments::table)
        .values(CreatePaymentEntity {
            id: Uuid::new_v4(),
            method: body.method.trim().to_owned(),
            details: body.details.unwrap_or_else(|| Value::Object(Default::default())),
            amount: body.amount,
        })
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to store payment")?;

    tracing::info!(payment_id = %payment.id, method = %payment.method, "Stored payment");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(payment),
            message: Some("Payment stored successfully"),
        },
    ))
}
