use skyseat_core::error::BookingResult;
use skyseat_core::lock::SeatLockService;
use skyseat_core::models::SeatStatus;
use skyseat_core::repository::InventoryStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Returns seats stuck in `LOCKED` to `AVAILABLE`.
///
/// A seat is only stuck when nobody holds its distributed lock anymore,
/// which happens when an instance dies between locking and releasing. The
/// reaper takes the seat lock itself before touching the row, so a booking
/// that locks the seat mid-sweep is never overwritten.
pub struct StaleSeatReaper {
    store: Arc<dyn InventoryStore>,
    locks: Arc<dyn SeatLockService>,
    interval: Duration,
}

impl StaleSeatReaper {
    pub fn new(store: Arc<dyn InventoryStore>, locks: Arc<dyn SeatLockService>, interval: Duration) -> Self {
        Self { store, locks, interval }
    }

    pub async fn sweep(&self) -> BookingResult<usize> {
        let mut reclaimed = 0;

        for flight in self.store.list_flights().await? {
            for seat in self.store.list_seats_by_status(flight.id, SeatStatus::Locked).await? {
                // Held by a live booking attempt
                let Some(token) = self.locks.acquire(flight.id, &seat.seat_code).await? else {
                    continue;
                };

                let reverted = self
                    .store
                    .transition_seat(flight.id, &seat.seat_code, SeatStatus::Locked, SeatStatus::Available)
                    .await;
                if let Err(e) = self.locks.release(flight.id, &seat.seat_code, &token).await {
                    error!("Failed to release reaper lock on seat {}: {}", seat.seat_code, e);
                }

                if reverted? {
                    warn!("Reclaimed stale LOCKED seat {} on flight {}", seat.seat_code, flight.id);
                    reclaimed += 1;
                }
            }
        }

        Ok(reclaimed)
    }

    pub async fn run(self) {
        info!("Stale seat reaper running every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(count) => info!("Reaper returned {} seats to inventory", count),
                Err(e) => error!("Stale seat sweep failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::SeatLockGuard;
    use async_trait::async_trait;
    use chrono::Utc;
    use skyseat_core::lock::{LockError, LockToken};
    use skyseat_core::models::{Flight, FlightStatus, Seat};
    use skyseat_core::repository::{FlightRepository, SeatRepository};
    use skyseat_store::{InMemoryLockService, InMemoryStore};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    fn flight() -> Flight {
        let now = Utc::now();
        Flight {
            id: Uuid::new_v4(),
            flight_number: "SK 1429".to_string(),
            origin: "ARN".to_string(),
            destination: "CPH".to_string(),
            flight_metadata: None,
            departure_time: now,
            arrival_time: now + chrono::Duration::minutes(70),
            status: FlightStatus::Scheduled,
            price_nuc: 9_900,
            max_passengers: 2,
            available_seats: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_sweep_only_reclaims_unlocked_seats() {
        let store = Arc::new(InMemoryStore::new());
        let locks = Arc::new(InMemoryLockService::new(Duration::from_secs(60)));
        let flight = flight();
        store.insert_flight(&flight).await.unwrap();
        store
            .insert_seats(&[Seat::new(flight.id, "A1"), Seat::new(flight.id, "A2")])
            .await
            .unwrap();

        for code in ["A1", "A2"] {
            store
                .transition_seat(flight.id, code, SeatStatus::Available, SeatStatus::Locked)
                .await
                .unwrap();
        }
        // A2 is still being booked
        let token = locks.acquire(flight.id, "A2").await.unwrap().unwrap();

        let reaper = StaleSeatReaper::new(store.clone(), locks.clone(), Duration::from_secs(60));
        assert_eq!(reaper.sweep().await.unwrap(), 1);

        let available = store.find_available_seats(flight.id).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].seat_code, "A1");

        locks.release(flight.id, "A2", &token).await.unwrap();
        assert_eq!(reaper.sweep().await.unwrap(), 1);
    }

    /// Lets the booking attempt that owns a seat finish, and a new attempt
    /// lock the same seat, the first time the reaper looks at it.
    struct HandoverDuringSweep {
        inner: Arc<InMemoryLockService>,
        store: Arc<InMemoryStore>,
        finishing: Mutex<Option<SeatLockGuard>>,
        next: Mutex<Option<SeatLockGuard>>,
    }

    impl HandoverDuringSweep {
        /// Releases the finishing attempt's guard; `true` if it was still held.
        async fn finish(&self) -> bool {
            match self.finishing.lock().await.take() {
                Some(finishing) => {
                    finishing.release().await;
                    true
                }
                None => false,
            }
        }

        async fn start_next(&self, flight_id: Uuid, seat_code: &str) {
            let next = SeatLockGuard::acquire(
                self.inner.clone(),
                self.store.clone(),
                flight_id,
                &[seat_code.to_string()],
            )
            .await
            .unwrap();
            *self.next.lock().await = Some(next);
        }
    }

    #[async_trait]
    impl SeatLockService for HandoverDuringSweep {
        async fn acquire(&self, flight_id: Uuid, seat_code: &str) -> Result<Option<LockToken>, LockError> {
            if self.finish().await {
                self.start_next(flight_id, seat_code).await;
            }
            self.inner.acquire(flight_id, seat_code).await
        }

        async fn release(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
            self.inner.release(flight_id, seat_code, token).await
        }

        async fn is_locked(&self, flight_id: Uuid, seat_code: &str) -> Result<bool, LockError> {
            let finished = self.finish().await;
            let locked = self.inner.is_locked(flight_id, seat_code).await;
            if finished {
                self.start_next(flight_id, seat_code).await;
            }
            locked
        }

        async fn extend(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
            self.inner.extend(flight_id, seat_code, token).await
        }

        fn ttl(&self) -> Duration {
            self.inner.ttl()
        }
    }

    #[tokio::test]
    async fn test_sweep_leaves_seat_locked_by_a_new_attempt() {
        let store = Arc::new(InMemoryStore::new());
        let inner = Arc::new(InMemoryLockService::new(Duration::from_secs(60)));
        let flight = flight();
        store.insert_flight(&flight).await.unwrap();
        store.insert_seats(&[Seat::new(flight.id, "A1")]).await.unwrap();

        let finishing = SeatLockGuard::acquire(inner.clone(), store.clone(), flight.id, &["A1".to_string()])
            .await
            .unwrap();
        let locks = Arc::new(HandoverDuringSweep {
            inner: inner.clone(),
            store: store.clone(),
            finishing: Mutex::new(Some(finishing)),
            next: Mutex::new(None),
        });

        let reaper = StaleSeatReaper::new(store.clone(), locks.clone(), Duration::from_secs(60));
        assert_eq!(reaper.sweep().await.unwrap(), 0);

        // The new attempt still owns both the lock and the LOCKED row
        assert!(inner.is_locked(flight.id, "A1").await.unwrap());
        let locked = store.list_seats_by_status(flight.id, SeatStatus::Locked).await.unwrap();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].seat_code, "A1");

        let next = locks.next.lock().await.take().unwrap();
        next.release().await;
        assert_eq!(store.find_available_seats(flight.id).await.unwrap().len(), 1);
        assert!(!inner.is_locked(flight.id, "A1").await.unwrap());
    }
}
