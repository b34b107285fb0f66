use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Flight, FlightStatus, Seat, SeatStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Seat {seat_code} not found on flight {flight_id}")]
    SeatNotFound { flight_id: Uuid, seat_code: String },

    #[error("Illegal seat transition {from} -> {to} for seat {seat_code}")]
    IllegalTransition {
        seat_code: String,
        from: SeatStatus,
        to: SeatStatus,
    },

    #[error("Seat counter for flight {flight_id} would leave [0, max] after adjusting by {delta}")]
    CounterOutOfRange { flight_id: Uuid, delta: i32 },

    #[error("Booking {0} was modified concurrently")]
    StaleBooking(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Flight rows and their `available_seats` counter.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn insert_flight(&self, flight: &Flight) -> Result<(), StoreError>;

    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError>;

    async fn list_flights(&self) -> Result<Vec<Flight>, StoreError>;

    /// Scheduled flights on `date` for the route with at least `min_seats` left.
    async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        min_seats: i32,
    ) -> Result<Vec<Flight>, StoreError>;

    async fn update_flight_status(
        &self,
        id: Uuid,
        status: FlightStatus,
    ) -> Result<Option<Flight>, StoreError>;
}

/// Seat rows. Exactly one row per (flight, seat code).
#[async_trait]
pub trait SeatRepository: Send + Sync {
    /// Idempotent bulk insert; existing (flight, seat code) rows are left
    /// untouched. Returns the number of rows created.
    async fn insert_seats(&self, seats: &[Seat]) -> Result<usize, StoreError>;

    async fn list_seats(&self, flight_id: Uuid) -> Result<Vec<Seat>, StoreError>;

    async fn list_seats_by_status(
        &self,
        flight_id: Uuid,
        status: SeatStatus,
    ) -> Result<Vec<Seat>, StoreError>;

    async fn find_available_seats(&self, flight_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        self.list_seats_by_status(flight_id, SeatStatus::Available).await
    }

    /// Compare-and-set on the seat state. `Ok(false)` when the seat is not
    /// currently in `from`; an illegal `from -> to` pair is an error.
    async fn transition_seat(
        &self,
        flight_id: Uuid,
        seat_code: &str,
        from: SeatStatus,
        to: SeatStatus,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Overwrites status, payment fields and PNR of an existing booking.
    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError>;

    async fn find_booking_by_pnr(&self, pnr: &str) -> Result<Option<Booking>, StoreError>;

    async fn list_bookings_by_user(&self, booked_by: &str) -> Result<Vec<Booking>, StoreError>;

    async fn list_bookings(&self) -> Result<Vec<Booking>, StoreError>;

    /// Atomically: booking PENDING -> its new (confirmed) state, its seats
    /// LOCKED -> OCCUPIED, booking seat rows written, and the flight counter
    /// decremented by the number of seats. Nothing is applied if any step fails.
    async fn commit_confirmation(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Atomically: booking `previous` -> its new (cancelled) state,
    /// `released_seats` OCCUPIED -> AVAILABLE and the flight counter
    /// incremented by their count. Fails with [`StoreError::StaleBooking`]
    /// if the stored status is no longer `previous`.
    async fn commit_cancellation(
        &self,
        booking: &Booking,
        previous: BookingStatus,
        released_seats: &[String],
    ) -> Result<(), StoreError>;
}

/// The full inventory store the booking engine runs against.
pub trait InventoryStore: FlightRepository + SeatRepository + BookingRepository {}

impl<T> InventoryStore for T where T: FlightRepository + SeatRepository + BookingRepository {}
