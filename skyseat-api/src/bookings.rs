use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use skyseat_booking::CreateBookingRequest;
use skyseat_core::models::Booking;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Passenger names come either as a list or as the comma-separated
/// `pax_details` string older clients send.
#[derive(Debug, Deserialize)]
struct BookingRequest {
    flight_id: Uuid,
    number_of_passengers: i32,
    #[serde(default)]
    passenger_names: Vec<String>,
    pax_details: Option<String>,
    booked_by: String,
}

impl From<BookingRequest> for CreateBookingRequest {
    fn from(req: BookingRequest) -> Self {
        let passenger_names = match req.pax_details {
            Some(details) if req.passenger_names.is_empty() => {
                details.split(',').map(|name| name.trim().to_string()).collect()
            }
            _ => req.passenger_names,
        };

        CreateBookingRequest {
            flight_id: req.flight_id,
            number_of_passengers: req.number_of_passengers,
            passenger_names,
            booked_by: req.booked_by,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/refunds/pending", get(pending_refunds))
        .route("/v1/bookings/pnr/{pnr}", get(get_by_pnr))
        .route("/v1/bookings/user/{booked_by}", get(list_by_user))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", put(cancel_booking))
        .route("/v1/bookings/{id}/refund", post(retry_refund))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(req.into()).await?;
    info!("Booking confirmed: {}", booking.booking_id);
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_bookings().await?))
}

async fn get_booking(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking(&id).await?))
}

async fn get_by_pnr(State(state): State<AppState>, Path(pnr): Path<String>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking_by_pnr(&pnr).await?))
}

async fn list_by_user(
    State(state): State<AppState>,
    Path(booked_by): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_bookings_by_user(&booked_by).await?))
}

async fn cancel_booking(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel_booking(&id).await?))
}

async fn pending_refunds(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_pending_refunds().await?))
}

async fn retry_refund(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.retry_refund(&id).await?))
}
