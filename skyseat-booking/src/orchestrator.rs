use serde::{Deserialize, Serialize};
use skyseat_core::error::{BookingError, BookingResult};
use skyseat_core::ids::{generate_booking_id, generate_pnr};
use skyseat_core::lock::SeatLockService;
use skyseat_core::models::{Booking, BookingSeat, BookingStatus, Flight, PaymentStatus};
use skyseat_core::payment::{AuthorizeRequest, PaymentReceipt};
use skyseat_core::repository::{InventoryStore, StoreError};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::allocation::allocate_seats;
use crate::guard::SeatLockGuard;
use crate::payment_client::PaymentClient;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_passengers_per_booking: i32,
    /// PNR draws before giving up on finding an unused one.
    pub pnr_attempts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_passengers_per_booking: 9,
            pnr_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub number_of_passengers: i32,
    #[serde(default)]
    pub passenger_names: Vec<String>,
    pub booked_by: String,
}

/// Runs the booking workflows against the inventory store, the seat lock
/// service and the payment gateway.
///
/// A create attempt moves through seat selection, all-or-nothing seat
/// locking, a `PENDING` booking row and payment authorization before it is
/// either committed as `CONFIRMED` or rolled back to `CANCELLED`. The seat
/// locks are held by a [`SeatLockGuard`] and released on every exit path.
/// The flight's `available_seats` counter only moves when a booking is
/// confirmed or a confirmed booking is cancelled.
pub struct BookingOrchestrator {
    store: Arc<dyn InventoryStore>,
    locks: Arc<dyn SeatLockService>,
    payments: PaymentClient,
    config: OrchestratorConfig,
}

impl BookingOrchestrator {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        locks: Arc<dyn SeatLockService>,
        payments: PaymentClient,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            locks,
            payments,
            config,
        }
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<Booking> {
        self.validate(&request)?;

        let flight = self
            .store
            .get_flight(request.flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(request.flight_id))?;

        // Advisory only, the seat locks below are what guarantee exclusivity
        if !flight.has_capacity_for(request.number_of_passengers) {
            return Err(BookingError::SeatsUnavailable(format!(
                "flight {} has {} seats left, {} requested",
                flight.id, flight.available_seats, request.number_of_passengers
            )));
        }

        let total_price = flight
            .price_nuc
            .checked_mul(i64::from(request.number_of_passengers))
            .ok_or_else(|| {
                BookingError::Validation(format!(
                    "total price for {} passengers on flight {} is out of range",
                    request.number_of_passengers, flight.id
                ))
            })?;

        let available = self.store.find_available_seats(flight.id).await?;
        let selected = allocate_seats(&available, request.number_of_passengers as usize)?;

        let mut guard = SeatLockGuard::acquire(self.locks.clone(), self.store.clone(), flight.id, &selected).await?;
        let result = self.reserve_and_pay(&flight, &request, total_price, &mut guard).await;
        guard.release().await;

        result
    }

    async fn reserve_and_pay(
        &self,
        flight: &Flight,
        request: &CreateBookingRequest,
        total_price: i64,
        guard: &mut SeatLockGuard,
    ) -> BookingResult<Booking> {
        let booking = Booking::pending(
            generate_booking_id(),
            flight.id,
            request.booked_by.trim().to_string(),
            request.passenger_names.clone(),
            request.number_of_passengers,
            total_price,
        );
        self.store.insert_booking(&booking).await?;
        info!("Booking {} created PENDING for seats {:?}", booking.booking_id, guard.seat_codes());

        let authorization = {
            let _heartbeat = guard.start_heartbeat();
            self.payments
                .authorize(&AuthorizeRequest::new(booking.booking_id.clone(), booking.total_price_nuc))
                .await
        };

        match authorization {
            Ok(receipt) if receipt.success => self.confirm(flight, booking, receipt, guard).await,
            Ok(receipt) => self.reject_payment(booking, receipt.message).await,
            Err(e) => self.reject_payment(booking, e.to_string()).await,
        }
    }

    async fn confirm(
        &self,
        flight: &Flight,
        pending: Booking,
        receipt: PaymentReceipt,
        guard: &mut SeatLockGuard,
    ) -> BookingResult<Booking> {
        let pnr = match self.unique_pnr().await {
            Ok(pnr) => pnr,
            Err(e) => return Err(self.abandon_paid(pending, &receipt, e).await),
        };

        let seats: Vec<BookingSeat> = guard
            .seat_codes()
            .into_iter()
            .enumerate()
            .map(|(index, seat_code)| BookingSeat {
                booking_id: pending.booking_id.clone(),
                seat_code,
                passenger_name: pending.passenger_name(index),
                seat_price_nuc: flight.price_nuc,
            })
            .collect();

        let mut booking = pending.clone();
        booking.confirm(pnr, receipt.transaction_id.clone(), seats)?;

        match self.store.commit_confirmation(&booking).await {
            Ok(()) => {
                guard.mark_committed();
                info!(
                    "Booking {} CONFIRMED with PNR {:?}, seats {:?}",
                    booking.booking_id,
                    booking.pnr,
                    booking.seat_codes()
                );
                Ok(booking)
            }
            Err(e) => {
                error!("Failed to commit booking {}: {}", booking.booking_id, e);
                Err(self.abandon_paid(pending, &receipt, e.into()).await)
            }
        }
    }

    /// Payment went through but the booking could not be committed: cancel
    /// it and hand the money back.
    async fn abandon_paid(&self, pending: Booking, receipt: &PaymentReceipt, cause: BookingError) -> BookingError {
        let mut booking = pending;
        booking.payment_id = Some(receipt.transaction_id.clone());
        booking.payment_status = PaymentStatus::Success;
        if let Err(e) = booking.cancel() {
            return e;
        }

        // A successful refund already persisted the booking
        if !self.refund(&mut booking).await {
            if let Err(e) = self.store.update_booking(&booking).await {
                error!("Failed to record abandoned booking {}: {}", booking.booking_id, e);
            }
        }
        cause
    }

    async fn reject_payment(&self, mut booking: Booking, message: String) -> BookingResult<Booking> {
        warn!("Payment for booking {} failed: {}", booking.booking_id, message);
        booking.fail_payment()?;
        if let Err(e) = self.store.update_booking(&booking).await {
            error!("Failed to record payment failure for booking {}: {}", booking.booking_id, e);
        }
        Err(BookingError::PaymentFailed(message))
    }

    async fn unique_pnr(&self) -> BookingResult<String> {
        for _ in 0..self.config.pnr_attempts.max(1) {
            let pnr = generate_pnr();
            if self.store.find_booking_by_pnr(&pnr).await?.is_none() {
                return Ok(pnr);
            }
            warn!("PNR {} already taken, drawing another", pnr);
        }
        Err(StoreError::Duplicate("no unused PNR found".to_string()).into())
    }

    fn validate(&self, request: &CreateBookingRequest) -> BookingResult<()> {
        let max = self.config.max_passengers_per_booking;
        if request.number_of_passengers < 1 || request.number_of_passengers > max {
            return Err(BookingError::Validation(format!(
                "number of passengers must be between 1 and {}",
                max
            )));
        }
        if request.booked_by.trim().is_empty() {
            return Err(BookingError::Validation("bookedBy is required".to_string()));
        }
        Ok(())
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> BookingResult<Booking> {
        let mut booking = self.get_booking(booking_id).await?;
        let previous = booking.cancel()?;

        let released = if previous == BookingStatus::Confirmed {
            booking.seat_codes()
        } else {
            Vec::new()
        };

        self.store
            .commit_cancellation(&booking, previous, &released)
            .await
            .map_err(|e| match e {
                StoreError::StaleBooking(id) => {
                    BookingError::InvalidState(format!("booking {} changed while being cancelled", id))
                }
                other => other.into(),
            })?;
        info!(
            "Booking {} CANCELLED (was {}), released seats {:?}",
            booking.booking_id, previous, released
        );

        if booking.awaits_refund() {
            self.refund(&mut booking).await;
        }

        Ok(booking)
    }

    /// Refund failures are logged and leave the booking discoverable through
    /// [`Self::list_pending_refunds`].
    async fn refund(&self, booking: &mut Booking) -> bool {
        let Some(transaction_id) = booking.payment_id.clone() else {
            return false;
        };

        match self.payments.refund(&transaction_id, booking.total_price_nuc).await {
            Ok(receipt) if receipt.success => {
                booking.mark_refunded();
                if let Err(e) = self.store.update_booking(booking).await {
                    error!("Refund {} for booking {} not recorded: {}", receipt.refund_id, booking.booking_id, e);
                }
                info!("Booking {} refunded ({})", booking.booking_id, receipt.refund_id);
                true
            }
            Ok(receipt) => {
                warn!("Refund for booking {} declined: {}", booking.booking_id, receipt.message);
                false
            }
            Err(e) => {
                warn!("Refund for booking {} failed, left for retry: {}", booking.booking_id, e);
                false
            }
        }
    }

    pub async fn list_pending_refunds(&self) -> BookingResult<Vec<Booking>> {
        let bookings = self.store.list_bookings().await?;
        Ok(bookings.into_iter().filter(Booking::awaits_refund).collect())
    }

    pub async fn retry_refund(&self, booking_id: &str) -> BookingResult<Booking> {
        let mut booking = self.get_booking(booking_id).await?;
        if !booking.awaits_refund() {
            return Err(BookingError::InvalidState(format!(
                "booking {} has no outstanding refund",
                booking_id
            )));
        }

        if self.refund(&mut booking).await {
            Ok(booking)
        } else {
            Err(BookingError::PaymentFailed(format!("refund for booking {} failed", booking_id)))
        }
    }

    pub async fn get_booking(&self, booking_id: &str) -> BookingResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))
    }

    pub async fn get_booking_by_pnr(&self, pnr: &str) -> BookingResult<Booking> {
        let pnr = pnr.trim().to_uppercase();
        self.store
            .find_booking_by_pnr(&pnr)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(format!("PNR {}", pnr)))
    }

    pub async fn list_bookings_by_user(&self, booked_by: &str) -> BookingResult<Vec<Booking>> {
        Ok(self.store.list_bookings_by_user(booked_by).await?)
    }

    pub async fn list_bookings(&self) -> BookingResult<Vec<Booking>> {
        Ok(self.store.list_bookings().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPaymentGateway;
    use crate::payment_client::PaymentClientConfig;
    use skyseat_store::{InMemoryLockService, InMemoryStore};
    use std::time::Duration;

    fn orchestrator() -> BookingOrchestrator {
        BookingOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryLockService::new(Duration::from_secs(60))),
            PaymentClient::new(Arc::new(MockPaymentGateway::approving()), PaymentClientConfig::default()),
            OrchestratorConfig::default(),
        )
    }

    fn request(passengers: i32, booked_by: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            flight_id: Uuid::new_v4(),
            number_of_passengers: passengers,
            passenger_names: vec![],
            booked_by: booked_by.to_string(),
        }
    }

    #[tokio::test]
    async fn test_validation_runs_before_lookup() {
        let orchestrator = orchestrator();

        for bad in [request(0, "agent"), request(10, "agent"), request(1, "   ")] {
            assert!(matches!(
                orchestrator.create_booking(bad).await,
                Err(BookingError::Validation(_))
            ));
        }

        assert!(matches!(
            orchestrator.create_booking(request(1, "agent")).await,
            Err(BookingError::FlightNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let orchestrator = orchestrator();
        assert!(matches!(
            orchestrator.cancel_booking("BK404").await,
            Err(BookingError::BookingNotFound(_))
        ));
        assert!(matches!(
            orchestrator.get_booking_by_pnr("zzzzzz").await,
            Err(BookingError::BookingNotFound(_))
        ));
    }
}
