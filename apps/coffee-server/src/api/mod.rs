// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        enforce_permission,
        permissions::{DELETE_DRINKS, GET_DRINKS, GET_DRINKS_DETAIL, PATCH_DRINKS, POST_DRINKS},
        Permission, PermissionGate,
    },
    error::ApiError,
    models::{CreateDrinkRequest, Drink, DrinkSummary, Ingredient, UpdateDrinkRequest},
    state::AppState,
};

pub mod drinks;
pub mod health;

/// Attach the permission layer for `required` to a single method route.
fn gated(
    state: &AppState,
    required: Permission,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let gate = PermissionGate::new(state.guard.clone(), required);
    route.route_layer(from_fn_with_state(gate, enforce_permission))
}

async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub fn router(state: AppState) -> Router {
    let drink_routes = Router::new()
        .route(
            "/drinks",
            gated(&state, GET_DRINKS, get(drinks::list_drinks))
                .merge(gated(&state, POST_DRINKS, post(drinks::create_drink))),
        )
        .route(
            "/drinks-detail",
            gated(&state, GET_DRINKS_DETAIL, get(drinks::list_drinks_detail)),
        )
        .route(
            "/drinks/{id}",
            gated(&state, PATCH_DRINKS, patch(drinks::update_drink))
                .merge(gated(&state, DELETE_DRINKS, delete(drinks::delete_drink))),
        );

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    Router::new()
        .merge(drink_routes)
        .merge(health_routes)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        drinks::list_drinks,
        drinks::list_drinks_detail,
        drinks::create_drink,
        drinks::update_drink,
        drinks::delete_drink,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Drink,
            DrinkSummary,
            Ingredient,
            CreateDrinkRequest,
            UpdateDrinkRequest,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Drinks", description = "Drink menu management"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
