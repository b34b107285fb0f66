use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use skyseat_catalog::NewFlight;
use skyseat_core::models::{Flight, FlightStatus, Seat};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SearchFlightsRequest {
    origin: String,
    destination: String,
    date: NaiveDate,
    #[serde(default = "default_passengers")]
    passengers: i32,
}

fn default_passengers() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: FlightStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(list_flights))
        .route("/v1/flights/search", post(search_flights))
        .route("/v1/flights/admin/add", post(add_flight))
        .route("/v1/flights/admin/{id}/status", put(update_status))
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/seats", get(list_seats))
}

async fn add_flight(
    State(state): State<AppState>,
    Json(req): Json<NewFlight>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    let flight = state.catalog.add_flight(req).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<Flight>>, AppError> {
    Ok(Json(state.catalog.list_flights().await?))
}

async fn get_flight(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.get_flight(id).await?))
}

async fn search_flights(
    State(state): State<AppState>,
    Json(req): Json<SearchFlightsRequest>,
) -> Result<Json<Vec<Flight>>, AppError> {
    let flights = state
        .catalog
        .search_flights(&req.origin, &req.destination, req.date, req.passengers)
        .await?;
    Ok(Json(flights))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.update_flight_status(id, req.status).await?))
}

async fn list_seats(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<Seat>>, AppError> {
    Ok(Json(state.catalog.list_seats(id).await?))
}
