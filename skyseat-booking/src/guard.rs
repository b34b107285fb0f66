use skyseat_core::error::BookingError;
use skyseat_core::lock::{LockToken, SeatLockService};
use skyseat_core::models::SeatStatus;
use skyseat_core::repository::InventoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Seat locks held by one booking attempt.
///
/// Acquisition is all-or-nothing and follows the order of the seat codes
/// given. Every seat that was moved `AVAILABLE -> LOCKED` is moved back and
/// every lock is released when the guard is released, unless the seats were
/// committed to a booking first. Dropping an unreleased guard schedules the
/// same cleanup on the current runtime.
pub struct SeatLockGuard {
    locks: Arc<dyn SeatLockService>,
    store: Arc<dyn InventoryStore>,
    flight_id: Uuid,
    held: Vec<(String, LockToken)>,
    marked: Vec<String>,
}

impl SeatLockGuard {
    pub async fn acquire(
        locks: Arc<dyn SeatLockService>,
        store: Arc<dyn InventoryStore>,
        flight_id: Uuid,
        seat_codes: &[String],
    ) -> Result<Self, BookingError> {
        let mut guard = Self {
            locks,
            store,
            flight_id,
            held: Vec::with_capacity(seat_codes.len()),
            marked: Vec::with_capacity(seat_codes.len()),
        };

        for seat_code in seat_codes {
            match guard.locks.acquire(flight_id, seat_code).await {
                Ok(Some(token)) => guard.held.push((seat_code.clone(), token)),
                Ok(None) => {
                    warn!("Seat {} on flight {} is locked by another booking", seat_code, flight_id);
                    guard.release().await;
                    return Err(BookingError::SeatsUnavailable(format!(
                        "seat {} is currently being booked by another request",
                        seat_code
                    )));
                }
                Err(e) => {
                    guard.release().await;
                    return Err(e.into());
                }
            }
        }

        for seat_code in seat_codes {
            match guard
                .store
                .transition_seat(flight_id, seat_code, SeatStatus::Available, SeatStatus::Locked)
                .await
            {
                Ok(true) => guard.marked.push(seat_code.clone()),
                Ok(false) => {
                    warn!("Seat {} on flight {} was taken before it could be locked", seat_code, flight_id);
                    guard.release().await;
                    return Err(BookingError::SeatsUnavailable(format!(
                        "seat {} is no longer available",
                        seat_code
                    )));
                }
                Err(e) => {
                    guard.release().await;
                    return Err(e.into());
                }
            }
        }

        info!("Locked seats {:?} on flight {}", seat_codes, flight_id);
        Ok(guard)
    }

    pub fn seat_codes(&self) -> Vec<String> {
        self.held.iter().map(|(code, _)| code.clone()).collect()
    }

    /// The seats now belong to a confirmed booking; release must not move
    /// them back to `AVAILABLE`.
    pub fn mark_committed(&mut self) {
        self.marked.clear();
    }

    /// Keeps every held lock alive at a third of the lock TTL until the
    /// returned handle is dropped.
    pub fn start_heartbeat(&self) -> LockHeartbeat {
        let locks = self.locks.clone();
        let flight_id = self.flight_id;
        let held = self.held.clone();
        let period = (locks.ttl() / 3).max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                for (seat_code, token) in &held {
                    match locks.extend(flight_id, seat_code, token).await {
                        Ok(true) => debug!("Extended lock on seat {} of flight {}", seat_code, flight_id),
                        Ok(false) => warn!("Lock on seat {} of flight {} was lost", seat_code, flight_id),
                        Err(e) => error!("Failed to extend lock on seat {}: {}", seat_code, e),
                    }
                }
            }
        });

        LockHeartbeat { handle }
    }

    pub async fn release(mut self) {
        let marked = std::mem::take(&mut self.marked);
        let held = std::mem::take(&mut self.held);
        release_all(self.locks.clone(), self.store.clone(), self.flight_id, marked, held).await;
    }
}

impl Drop for SeatLockGuard {
    fn drop(&mut self) {
        if self.held.is_empty() && self.marked.is_empty() {
            return;
        }

        let marked = std::mem::take(&mut self.marked);
        let held = std::mem::take(&mut self.held);
        match Handle::try_current() {
            Ok(handle) => {
                warn!("Seat lock guard for flight {} dropped without release", self.flight_id);
                handle.spawn(release_all(self.locks.clone(), self.store.clone(), self.flight_id, marked, held));
            }
            Err(_) => error!(
                "Seat lock guard for flight {} dropped outside a runtime, {} locks left to expire",
                self.flight_id,
                held.len()
            ),
        }
    }
}

/// Seats go back to `AVAILABLE` before their locks are dropped so that a
/// competing request never locks a seat that still reads `LOCKED`.
async fn release_all(
    locks: Arc<dyn SeatLockService>,
    store: Arc<dyn InventoryStore>,
    flight_id: Uuid,
    marked: Vec<String>,
    held: Vec<(String, LockToken)>,
) {
    for seat_code in &marked {
        match store
            .transition_seat(flight_id, seat_code, SeatStatus::Locked, SeatStatus::Available)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!("Seat {} on flight {} was not LOCKED on release", seat_code, flight_id),
            Err(e) => error!("Failed to revert seat {} on flight {}: {}", seat_code, flight_id, e),
        }
    }

    for (seat_code, token) in held.iter().rev() {
        match locks.release(flight_id, seat_code, token).await {
            Ok(true) => debug!("Released lock on seat {} of flight {}", seat_code, flight_id),
            Ok(false) => warn!("Lock on seat {} of flight {} expired before release", seat_code, flight_id),
            Err(e) => error!("Failed to release lock on seat {}: {}", seat_code, e),
        }
    }
}

/// Background lock extension; stops when dropped.
pub struct LockHeartbeat {
    handle: JoinHandle<()>,
}

impl Drop for LockHeartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
