// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Drink menu handlers.
//!
//! Every route here sits behind a per-route permission layer (see
//! [`super::router`]), so by the time a handler runs the [`Claims`] extractor
//! only reads the payload the layer already verified.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Json,
};
use tracing::{debug, info};

use crate::{
    auth::Claims,
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteResponse, Drink, DrinkSummary, DrinksResponse,
        UpdateDrinkRequest,
    },
    state::AppState,
    storage::StoreError,
};

fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}

#[utoipa::path(
    get,
    path = "/drinks",
    tag = "Drinks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DrinksResponse<DrinkSummary>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing get:drinks"),
        (status = 404, description = "The menu is empty")
    )
)]
pub async fn list_drinks(
    Claims(_payload): Claims,
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkSummary>>, ApiError> {
    let drinks = state.drinks.blocking(|db| db.list()).await?;
    if drinks.is_empty() {
        return Err(not_found());
    }
    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::short).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/drinks-detail",
    tag = "Drinks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DrinksResponse<Drink>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing get:drinks-detail"),
        (status = 404, description = "The menu is empty")
    )
)]
pub async fn list_drinks_detail(
    Claims(payload): Claims,
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let drinks = state.drinks.blocking(|db| db.list()).await?;
    if drinks.is_empty() {
        return Err(not_found());
    }
    debug!(subject = payload.subject(), count = drinks.len(), "Listing recipes");
    Ok(Json(DrinksResponse::new(drinks)))
}

#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    tag = "Drinks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DrinksResponse<Drink>),
        (status = 400, description = "Invalid body or duplicate title"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing post:drinks")
    )
)]
pub async fn create_drink(
    Claims(payload): Claims,
    State(state): State<AppState>,
    body: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let CreateDrinkRequest { title, recipe } = request;
    let drink = state
        .drinks
        .blocking(move |db| db.insert(&title, recipe.into_vec()))
        .await?;
    info!(subject = payload.subject(), drink_id = drink.id, "Drink added to menu");
    Ok(Json(DrinksResponse::new(vec![drink])))
}

#[utoipa::path(
    patch,
    path = "/drinks/{id}",
    params(("id" = u64, Path, description = "Drink identifier")),
    request_body = UpdateDrinkRequest,
    tag = "Drinks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DrinksResponse<Drink>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing patch:drinks"),
        (status = 404, description = "Unknown drink"),
        (status = 422, description = "Invalid body or duplicate title")
    )
)]
pub async fn update_drink(
    Claims(payload): Claims,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let Path(id) = id.map_err(|_| not_found())?;
    let Json(request) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;

    let UpdateDrinkRequest { title, recipe } = request;
    let drink = state
        .drinks
        .blocking(move |db| db.update(id, title.as_deref(), recipe.map(|r| r.into_vec())))
        .await
        .map_err(|e| match e {
            StoreError::DuplicateTitle(_) | StoreError::InvalidDrink(_) => {
                ApiError::unprocessable(e.to_string())
            }
            other => other.into(),
        })?;
    info!(subject = payload.subject(), drink_id = id, "Drink updated");
    Ok(Json(DrinksResponse::new(vec![drink])))
}

#[utoipa::path(
    delete,
    path = "/drinks/{id}",
    params(("id" = u64, Path, description = "Drink identifier")),
    tag = "Drinks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DeleteResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing delete:drinks"),
        (status = 404, description = "Unknown drink")
    )
)]
pub async fn delete_drink(
    Claims(payload): Claims,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path(id) = id.map_err(|_| not_found())?;

    state.drinks.blocking(move |db| db.delete(id)).await?;
    info!(subject = payload.subject(), drink_id = id, "Drink removed from menu");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
