use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use skyseat_core::lock::{seat_lock_key, LockError, LockToken, SeatLockService};
use skyseat_core::models::{Booking, BookingStatus, Flight, FlightStatus, Seat, SeatStatus};
use skyseat_core::repository::{BookingRepository, FlightRepository, SeatRepository, StoreError};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

struct LockEntry {
    token: LockToken,
    expires_at: Instant,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local seat locks for single-instance deployments and tests.
/// Expired entries are treated as absent and swept lazily.
pub struct InMemoryLockService {
    entries: Mutex<HashMap<String, LockEntry>>,
    key_prefix: String,
    ttl: Duration,
}

impl InMemoryLockService {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            key_prefix: "seat:lock:".to_string(),
            ttl,
        }
    }

    fn key(&self, flight_id: Uuid, seat_code: &str) -> String {
        seat_lock_key(&self.key_prefix, flight_id, seat_code)
    }

    /// Number of live locks, for diagnostics.
    pub async fn held_count(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().await.values().filter(|e| e.is_live(now)).count()
    }
}

#[async_trait]
impl SeatLockService for InMemoryLockService {
    async fn acquire(&self, flight_id: Uuid, seat_code: &str) -> Result<Option<LockToken>, LockError> {
        let key = self.key(flight_id, seat_code);
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if entries.get(&key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(None);
        }

        let token = LockToken::generate();
        entries.insert(key, LockEntry {
            token: token.clone(),
            expires_at: now + self.ttl,
        });
        Ok(Some(token))
    }

    async fn release(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
        let key = self.key(flight_id, seat_code);
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let (live, owned) = match entries.get(&key) {
            Some(entry) => (entry.is_live(now), &entry.token == token),
            None => return Ok(false),
        };

        if !live {
            entries.remove(&key);
            return Ok(false);
        }
        if owned {
            entries.remove(&key);
        }
        Ok(owned)
    }

    async fn is_locked(&self, flight_id: Uuid, seat_code: &str) -> Result<bool, LockError> {
        let key = self.key(flight_id, seat_code);
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries.get(&key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn extend(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
        let key = self.key(flight_id, seat_code);
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(&key) {
            Some(entry) if entry.is_live(now) && &entry.token == token => {
                entry.expires_at = now + self.ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[derive(Default)]
struct Tables {
    flights: HashMap<Uuid, Flight>,
    seats: HashMap<Uuid, HashMap<String, Seat>>,
    bookings: HashMap<String, Booking>,
}

impl Tables {
    fn seat_mut(&mut self, flight_id: Uuid, seat_code: &str) -> Result<&mut Seat, StoreError> {
        self.seats
            .get_mut(&flight_id)
            .and_then(|seats| seats.get_mut(seat_code))
            .ok_or_else(|| StoreError::SeatNotFound {
                flight_id,
                seat_code: seat_code.to_string(),
            })
    }

    fn seat_status(&self, flight_id: Uuid, seat_code: &str) -> Result<SeatStatus, StoreError> {
        self.seats
            .get(&flight_id)
            .and_then(|seats| seats.get(seat_code))
            .map(|seat| seat.status)
            .ok_or_else(|| StoreError::SeatNotFound {
                flight_id,
                seat_code: seat_code.to_string(),
            })
    }

    fn check_counter(&self, flight_id: Uuid, delta: i32) -> Result<(), StoreError> {
        let flight = self
            .flights
            .get(&flight_id)
            .ok_or(StoreError::FlightNotFound(flight_id))?;
        let next = flight.available_seats + delta;
        if next < 0 || next > flight.max_passengers {
            return Err(StoreError::CounterOutOfRange { flight_id, delta });
        }
        Ok(())
    }

    fn apply_counter(&mut self, flight_id: Uuid, delta: i32) -> Result<i32, StoreError> {
        self.check_counter(flight_id, delta)?;
        let flight = self
            .flights
            .get_mut(&flight_id)
            .ok_or(StoreError::FlightNotFound(flight_id))?;
        flight.available_seats += delta;
        flight.updated_at = Utc::now();
        Ok(flight.available_seats)
    }

    fn set_seat_status(&mut self, flight_id: Uuid, seat_code: &str, status: SeatStatus) -> Result<(), StoreError> {
        let seat = self.seat_mut(flight_id, seat_code)?;
        seat.status = status;
        seat.updated_at = Utc::now();
        Ok(())
    }
}

/// Inventory store kept behind a single lock, so every multi-row commit is
/// trivially atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn insert_flight(&self, flight: &Flight) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.flights.contains_key(&flight.id) {
            return Err(StoreError::Duplicate(format!("flight {}", flight.id)));
        }
        tables.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        Ok(self.tables.read().await.flights.get(&id).cloned())
    }

    async fn list_flights(&self) -> Result<Vec<Flight>, StoreError> {
        let tables = self.tables.read().await;
        let mut flights: Vec<Flight> = tables.flights.values().cloned().collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        min_seats: i32,
    ) -> Result<Vec<Flight>, StoreError> {
        let tables = self.tables.read().await;
        let mut flights: Vec<Flight> = tables
            .flights
            .values()
            .filter(|f| {
                f.status == FlightStatus::Scheduled
                    && f.origin.eq_ignore_ascii_case(origin)
                    && f.destination.eq_ignore_ascii_case(destination)
                    && f.departure_time.date_naive() == date
                    && f.available_seats >= min_seats
            })
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> Result<Option<Flight>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.flights.get_mut(&id).map(|flight| {
            flight.update_status(status);
            flight.clone()
        }))
    }
}

#[async_trait]
impl SeatRepository for InMemoryStore {
    async fn insert_seats(&self, seats: &[Seat]) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let mut created = 0;
        for seat in seats {
            let flight_seats = tables.seats.entry(seat.flight_id).or_default();
            if !flight_seats.contains_key(&seat.seat_code) {
                flight_seats.insert(seat.seat_code.clone(), seat.clone());
                created += 1;
            }
        }
        Ok(created)
    }

    async fn list_seats(&self, flight_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .seats
            .get(&flight_id)
            .map(|seats| seats.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_seats_by_status(&self, flight_id: Uuid, status: SeatStatus) -> Result<Vec<Seat>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .seats
            .get(&flight_id)
            .map(|seats| seats.values().filter(|s| s.status == status).cloned().collect())
            .unwrap_or_default())
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

        let mut tables = self.tables.write().await;
        let seat = tables.seat_mut(flight_id, seat_code)?;
        if seat.status != from {
            return Ok(false);
        }
        seat.status = to;
        seat.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.bookings.contains_key(&booking.booking_id) {
            return Err(StoreError::Duplicate(format!("booking {}", booking.booking_id)));
        }
        tables.bookings.insert(booking.booking_id.clone(), booking.clone());
        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .bookings
            .get_mut(&booking.booking_id)
            .ok_or_else(|| StoreError::StaleBooking(booking.booking_id.clone()))?;
        stored.status = booking.status;
        stored.payment_status = booking.payment_status;
        stored.payment_id = booking.payment_id.clone();
        stored.pnr = booking.pnr.clone();
        stored.updated_at = booking.updated_at;
        Ok(())
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.read().await.bookings.get(booking_id).cloned())
    }

    async fn find_booking_by_pnr(&self, pnr: &str) -> Result<Option<Booking>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.pnr.as_deref() == Some(pnr))
            .cloned())
    }

    async fn list_bookings_by_user(&self, booked_by: &str) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.booked_by == booked_by)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables.bookings.values().cloned().collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn commit_confirmation(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        // Validate everything before touching any row
        match tables.bookings.get(&booking.booking_id) {
            Some(stored) if stored.status == BookingStatus::Pending => {}
            _ => return Err(StoreError::StaleBooking(booking.booking_id.clone())),
        }
        for seat in &booking.seats {
            let status = tables.seat_status(booking.flight_id, &seat.seat_code)?;
            if status != SeatStatus::Locked {
                return Err(StoreError::IllegalTransition {
                    seat_code: seat.seat_code.clone(),
                    from: status,
                    to: SeatStatus::Occupied,
                });
            }
        }
        let delta = -(booking.seats.len() as i32);
        tables.check_counter(booking.flight_id, delta)?;

        for seat in &booking.seats {
            tables.set_seat_status(booking.flight_id, &seat.seat_code, SeatStatus::Occupied)?;
        }
        tables.apply_counter(booking.flight_id, delta)?;
        tables.bookings.insert(booking.booking_id.clone(), booking.clone());
        Ok(())
    }

    async fn commit_cancellation(
        &self,
        booking: &Booking,
        previous: BookingStatus,
        released_seats: &[String],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        match tables.bookings.get(&booking.booking_id) {
            Some(stored) if stored.status == previous => {}
            _ => return Err(StoreError::StaleBooking(booking.booking_id.clone())),
        }
        for seat_code in released_seats {
            let status = tables.seat_status(booking.flight_id, seat_code)?;
            if status != SeatStatus::Occupied {
                return Err(StoreError::IllegalTransition {
                    seat_code: seat_code.clone(),
                    from: status,
                    to: SeatStatus::Available,
                });
            }
        }
        let delta = released_seats.len() as i32;
        tables.check_counter(booking.flight_id, delta)?;

        for seat_code in released_seats {
            tables.set_seat_status(booking.flight_id, seat_code, SeatStatus::Available)?;
        }
        tables.apply_counter(booking.flight_id, delta)?;
        tables.bookings.insert(booking.booking_id.clone(), booking.clone());
        Ok(())
    }
}
