use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, swagger};

pub mod auth;
pub mod bills;
pub mod bookings;
pub mod employees;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod restaurants;
pub mod users;

/// Every resource router, with OpenAPI metadata.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    auth::routes_with_openapi()
        .merge(users::routes_with_openapi(state))
        .merge(restaurants::routes_with_openapi(state))
        .merge(menu::routes_with_openapi(state))
        .merge(employees::routes_with_openapi(state))
        .merge(orders::routes_with_openapi(state))
        .merge(bills::routes_with_openapi(state))
        .merge(bookings::routes_with_openapi(state))
        .merge(payments::routes_with_openapi())
}

/// The complete application: resource routes, Swagger UI and request tracing.
pub fn app(state: AppState) -> Router {
    let (router, mut openapi) = routes_with_openapi(&state).split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Restaurant Ops API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    router
        .merge(swagger_ui)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
