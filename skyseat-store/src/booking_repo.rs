use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyseat_core::models::{Booking, BookingSeat, BookingStatus, PaymentStatus, SeatStatus};
use skyseat_core::repository::{BookingRepository, StoreError};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::{backend, corrupt, PgInventoryStore};

const BOOKING_COLUMNS: &str = "booking_id, flight_id, booked_by, passenger_names, number_of_passengers, \
    total_price_nuc, status, payment_status, payment_id, pnr, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: String,
    flight_id: Uuid,
    booked_by: String,
    passenger_names: Vec<String>,
    number_of_passengers: i32,
    total_price_nuc: i64,
    status: String,
    payment_status: String,
    payment_id: Option<String>,
    pnr: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BookingSeatRow {
    booking_id: String,
    seat_code: String,
    passenger_name: String,
    seat_price_nuc: i64,
}

impl BookingRow {
    fn into_booking(self, seats: Vec<BookingSeat>) -> Result<Booking, StoreError> {
        let status: BookingStatus = self.status.parse().map_err(|_| corrupt("booking status", &self.status))?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(|_| corrupt("payment status", &self.payment_status))?;

        Ok(Booking {
            booking_id: self.booking_id,
            flight_id: self.flight_id,
            booked_by: self.booked_by,
            passenger_names: self.passenger_names,
            number_of_passengers: self.number_of_passengers,
            total_price_nuc: self.total_price_nuc,
            status,
            payment_status,
            payment_id: self.payment_id,
            pnr: self.pnr,
            seats,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgInventoryStore {
    /// Loads the seat assignments for `rows` in one round trip.
    async fn hydrate(&self, rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|r| r.booking_id.clone()).collect();
        let seat_rows: Vec<BookingSeatRow> = sqlx::query_as(
            r#"
            SELECT booking_id, seat_code, passenger_name, seat_price_nuc
            FROM booking_seats WHERE booking_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut seats: HashMap<String, Vec<BookingSeat>> = HashMap::new();
        for row in seat_rows {
            seats.entry(row.booking_id.clone()).or_default().push(BookingSeat {
                booking_id: row.booking_id,
                seat_code: row.seat_code,
                passenger_name: row.passenger_name,
                seat_price_nuc: row.seat_price_nuc,
            });
        }

        rows.into_iter()
            .map(|row| {
                let assigned = seats.remove(&row.booking_id).unwrap_or_default();
                row.into_booking(assigned)
            })
            .collect()
    }

    async fn fetch_one(&self, filter: &str, value: &str) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings WHERE {} = $1", BOOKING_COLUMNS, filter))
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Conditional booking update inside a transaction; fails when the stored
/// status is no longer `expected`.
async fn update_booking_from(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
    expected: BookingStatus,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET status = $2, payment_status = $3, payment_id = $4, pnr = $5, updated_at = $6
        WHERE booking_id = $1 AND status = $7
        "#,
    )
    .bind(&booking.booking_id)
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(&booking.payment_id)
    .bind(&booking.pnr)
    .bind(booking.updated_at)
    .bind(expected.as_str())
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    if result.rows_affected() != 1 {
        return Err(StoreError::StaleBooking(booking.booking_id.clone()));
    }
    Ok(())
}

async fn move_seat(
    tx: &mut Transaction<'_, Postgres>,
    flight_id: Uuid,
    seat_code: &str,
    from: SeatStatus,
    to: SeatStatus,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE seats SET status = $4, updated_at = now() WHERE flight_id = $1 AND seat_code = $2 AND status = $3",
    )
    .bind(flight_id)
    .bind(seat_code)
    .bind(from.as_str())
    .bind(to.as_str())
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    if result.rows_affected() != 1 {
        return Err(StoreError::IllegalTransition {
            seat_code: seat_code.to_string(),
            from,
            to,
        });
    }
    Ok(())
}

async fn adjust_counter(tx: &mut Transaction<'_, Postgres>, flight_id: Uuid, delta: i32) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE flights
        SET available_seats = available_seats + $2, updated_at = now()
        WHERE id = $1 AND available_seats + $2 BETWEEN 0 AND max_passengers
        "#,
    )
    .bind(flight_id)
    .bind(delta)
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    if result.rows_affected() != 1 {
        return Err(StoreError::CounterOutOfRange { flight_id, delta });
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for PgInventoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, flight_id, booked_by, passenger_names, number_of_passengers,
                                  total_price_nuc, status, payment_status, payment_id, pnr, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&booking.booking_id)
        .bind(booking.flight_id)
        .bind(&booking.booked_by)
        .bind(&booking.passenger_names)
        .bind(booking.number_of_passengers)
        .bind(booking.total_price_nuc)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_id)
        .bind(&booking.pnr)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, payment_status = $3, payment_id = $4, pnr = $5, updated_at = $6
            WHERE booking_id = $1
            "#,
        )
        .bind(&booking.booking_id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_id)
        .bind(&booking.pnr)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() != 1 {
            return Err(StoreError::StaleBooking(booking.booking_id.clone()));
        }
        Ok(())
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        self.fetch_one("booking_id", booking_id).await
    }

    async fn find_booking_by_pnr(&self, pnr: &str) -> Result<Option<Booking>, StoreError> {
        self.fetch_one("pnr", pnr).await
    }

    async fn list_bookings_by_user(&self, booked_by: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE booked_by = $1 ORDER BY created_at",
            BOOKING_COLUMNS
        ))
        .bind(booked_by)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        self.hydrate(rows).await
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings ORDER BY created_at", BOOKING_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        self.hydrate(rows).await
    }

    async fn commit_confirmation(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        update_booking_from(&mut tx, booking, BookingStatus::Pending).await?;

        for seat in &booking.seats {
            move_seat(&mut tx, booking.flight_id, &seat.seat_code, SeatStatus::Locked, SeatStatus::Occupied).await?;

            sqlx::query(
                r#"
                INSERT INTO booking_seats (booking_id, seat_code, passenger_name, seat_price_nuc)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&seat.booking_id)
            .bind(&seat.seat_code)
            .bind(&seat.passenger_name)
            .bind(seat.seat_price_nuc)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        adjust_counter(&mut tx, booking.flight_id, -(booking.seats.len() as i32)).await?;

        // Dropping `tx` on any early return above rolls everything back
        tx.commit().await.map_err(backend)
    }

    async fn commit_cancellation(
        &self,
        booking: &Booking,
        previous: BookingStatus,
        released_seats: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        update_booking_from(&mut tx, booking, previous).await?;

        for seat_code in released_seats {
            move_seat(&mut tx, booking.flight_id, seat_code, SeatStatus::Occupied, SeatStatus::Available).await?;
        }

        if !released_seats.is_empty() {
            adjust_counter(&mut tx, booking.flight_id, released_seats.len() as i32).await?;
        }

        tx.commit().await.map_err(backend)
    }
}
