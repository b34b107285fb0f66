use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use skyseat_core::models::{Flight, FlightStatus, Seat, SeatStatus};
use skyseat_core::repository::{FlightRepository, SeatRepository, StoreError};
use uuid::Uuid;

use crate::database::{backend, corrupt, PgInventoryStore};

const FLIGHT_COLUMNS: &str = "id, flight_number, origin, destination, flight_metadata, departure_time, \
    arrival_time, status, price_nuc, max_passengers, available_seats, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    origin: String,
    destination: String,
    flight_metadata: Option<String>,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    status: String,
    price_nuc: i64,
    max_passengers: i32,
    available_seats: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        let status: FlightStatus = row.status.parse().map_err(|_| corrupt("flight status", &row.status))?;
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            origin: row.origin,
            destination: row.destination,
            flight_metadata: row.flight_metadata,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            status,
            price_nuc: row.price_nuc,
            max_passengers: row.max_passengers,
            available_seats: row.available_seats,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    flight_id: Uuid,
    seat_code: String,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        let status: SeatStatus = row.status.parse().map_err(|_| corrupt("seat status", &row.status))?;
        Ok(Seat {
            flight_id: row.flight_id,
            seat_code: row.seat_code,
            status,
            updated_at: row.updated_at,
        })
    }
}

fn into_flights(rows: Vec<FlightRow>) -> Result<Vec<Flight>, StoreError> {
    rows.into_iter().map(Flight::try_from).collect()
}

fn into_seats(rows: Vec<SeatRow>) -> Result<Vec<Seat>, StoreError> {
    rows.into_iter().map(Seat::try_from).collect()
}

#[async_trait]
impl FlightRepository for PgInventoryStore {
    async fn insert_flight(&self, flight: &Flight) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, origin, destination, flight_metadata, departure_time,
                                 arrival_time, status, price_nuc, max_passengers, available_seats, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(&flight.flight_metadata)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.status.as_str())
        .bind(flight.price_nuc)
        .bind(flight.max_passengers)
        .bind(flight.available_seats)
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        let row: Option<FlightRow> = sqlx::query_as(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Flight::try_from).transpose()
    }

    async fn list_flights(&self) -> Result<Vec<Flight>, StoreError> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!("SELECT {} FROM flights ORDER BY departure_time", FLIGHT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        into_flights(rows)
    }

    async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        min_seats: i32,
    ) -> Result<Vec<Flight>, StoreError> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM flights
            WHERE UPPER(origin) = UPPER($1)
              AND UPPER(destination) = UPPER($2)
              AND (departure_time AT TIME ZONE 'UTC')::date = $3
              AND status = $4
              AND available_seats >= $5
            ORDER BY departure_time
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(origin)
        .bind(destination)
        .bind(date)
        .bind(FlightStatus::Scheduled.as_str())
        .bind(min_seats)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        into_flights(rows)
    }

    async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> Result<Option<Flight>, StoreError> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "UPDATE flights SET status = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Flight::try_from).transpose()
    }
}

#[async_trait]
impl SeatRepository for PgInventoryStore {
    async fn insert_seats(&self, seats: &[Seat]) -> Result<usize, StoreError> {
        if seats.is_empty() {
            return Ok(0);
        }

        let flight_ids: Vec<Uuid> = seats.iter().map(|s| s.flight_id).collect();
        let codes: Vec<String> = seats.iter().map(|s| s.seat_code.clone()).collect();
        let statuses: Vec<String> = seats.iter().map(|s| s.status.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO seats (flight_id, seat_code, status)
            SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[])
            ON CONFLICT (flight_id, seat_code) DO NOTHING
            "#,
        )
        .bind(&flight_ids)
        .bind(&codes)
        .bind(&statuses)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() as usize)
    }

    async fn list_seats(&self, flight_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT flight_id, seat_code, status, updated_at FROM seats WHERE flight_id = $1",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        into_seats(rows)
    }

    async fn list_seats_by_status(&self, flight_id: Uuid, status: SeatStatus) -> Result<Vec<Seat>, StoreError> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT flight_id, seat_code, status, updated_at FROM seats WHERE flight_id = $1 AND status = $2",
        )
        .bind(flight_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        into_seats(rows)
    }

    async fn transition_seat(
        &self,
        flight_id: Uuid,
        seat_code: &str,
        from: SeatStatus,
        to: SeatStatus,
    ) -> Result<bool, StoreError> {
        if !from.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                seat_code: seat_code.to_string(),
                from,
                to,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE seats SET status = $4, updated_at = now()
            WHERE flight_id = $1 AND seat_code = $2 AND status = $3
            "#,
        )
        .bind(flight_id)
        .bind(seat_code)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(String,)> = sqlx::query_as("SELECT status FROM seats WHERE flight_id = $1 AND seat_code = $2")
            .bind(flight_id)
            .bind(seat_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::SeatNotFound {
                flight_id,
                seat_code: seat_code.to_string(),
            }),
        }
    }
}
