use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::BookingError;

/// Implements string conversions for the status enums so that stores can
/// persist them as plain text columns.
macro_rules! status_strings {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} value: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Delayed,
    Boarding,
    Departed,
    Cancelled,
}

status_strings!(FlightStatus {
    Scheduled => "SCHEDULED",
    Delayed => "DELAYED",
    Boarding => "BOARDING",
    Departed => "DEPARTED",
    Cancelled => "CANCELLED",
});

/// A scheduled flight and its seat counter.
///
/// `available_seats` mirrors the number of seats in [`SeatStatus::Available`]
/// once all in-flight reservations have settled. It only moves when a booking
/// is confirmed or cancelled, never while seats are merely locked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub flight_metadata: Option<String>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub price_nuc: i64,
    pub max_passengers: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn has_capacity_for(&self, passengers: i32) -> bool {
        self.available_seats >= passengers
    }

    pub fn update_status(&mut self, new_status: FlightStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Locked,
    Occupied,
}

status_strings!(SeatStatus {
    Available => "AVAILABLE",
    Locked => "LOCKED",
    Occupied => "OCCUPIED",
});

impl SeatStatus {
    /// Legal seat lifecycle moves. `AVAILABLE -> OCCUPIED` must pass through
    /// `LOCKED`, and an occupied seat is never re-locked.
    pub fn can_transition_to(&self, next: SeatStatus) -> bool {
        matches!(
            (self, next),
            (SeatStatus::Available, SeatStatus::Locked)
                | (SeatStatus::Locked, SeatStatus::Occupied)
                | (SeatStatus::Locked, SeatStatus::Available)
                | (SeatStatus::Occupied, SeatStatus::Available)
        )
    }
}

/// One physical seat; unique per (flight, seat code).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub flight_id: Uuid,
    pub seat_code: String,
    pub status: SeatStatus,
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    pub fn new(flight_id: Uuid, seat_code: impl Into<String>) -> Self {
        Self {
            flight_id,
            seat_code: seat_code.into(),
            status: SeatStatus::Available,
            updated_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

status_strings!(BookingStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

status_strings!(PaymentStatus {
    Pending => "PENDING",
    Success => "SUCCESS",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

/// A passenger's assigned seat on a confirmed booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingSeat {
    pub booking_id: String,
    pub seat_code: String,
    pub passenger_name: String,
    pub seat_price_nuc: i64,
}

/// Bookings are never deleted; cancelled rows stay behind as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub flight_id: Uuid,
    pub booked_by: String,
    pub passenger_names: Vec<String>,
    pub number_of_passengers: i32,
    pub total_price_nuc: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub pnr: Option<String>,
    pub seats: Vec<BookingSeat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(
        booking_id: String,
        flight_id: Uuid,
        booked_by: String,
        passenger_names: Vec<String>,
        number_of_passengers: i32,
        total_price_nuc: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            booking_id,
            flight_id,
            booked_by,
            passenger_names,
            number_of_passengers,
            total_price_nuc,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            pnr: None,
            seats: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Passenger name for the seat at `index`, falling back to a placeholder
    /// when the manifest is shorter than the number of seats.
    pub fn passenger_name(&self, index: usize) -> String {
        self.passenger_names
            .get(index)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Passenger {}", index + 1))
    }

    /// Transition: PENDING -> CONFIRMED after a successful authorization.
    pub fn confirm(
        &mut self,
        pnr: String,
        transaction_id: String,
        seats: Vec<BookingSeat>,
    ) -> Result<(), BookingError> {
        if self.status != BookingStatus::Pending {
            return Err(BookingError::InvalidState(format!(
                "cannot confirm booking {} in status {}",
                self.booking_id, self.status
            )));
        }

        self.pnr = Some(pnr);
        self.payment_id = Some(transaction_id);
        self.payment_status = PaymentStatus::Success;
        self.seats = seats;
        self.status = BookingStatus::Confirmed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: PENDING -> CANCELLED because the payment was not authorized.
    pub fn fail_payment(&mut self) -> Result<(), BookingError> {
        if self.status != BookingStatus::Pending {
            return Err(BookingError::InvalidState(format!(
                "cannot fail payment of booking {} in status {}",
                self.booking_id, self.status
            )));
        }

        self.payment_status = PaymentStatus::Failed;
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: PENDING | CONFIRMED -> CANCELLED. Returns the status the
    /// booking was in before the call.
    pub fn cancel(&mut self) -> Result<BookingStatus, BookingError> {
        let previous = self.status;
        if previous == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(format!(
                "booking {} is already cancelled",
                self.booking_id
            )));
        }

        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn mark_refunded(&mut self) {
        self.payment_status = PaymentStatus::Refunded;
        self.updated_at = Utc::now();
    }

    /// Cancelled after a successful charge, with the refund still outstanding.
    pub fn awaits_refund(&self) -> bool {
        self.status == BookingStatus::Cancelled
            && self.payment_status == PaymentStatus::Success
            && self.payment_id.is_some()
    }

    pub fn seat_codes(&self) -> Vec<String> {
        self.seats.iter().map(|seat| seat.seat_code.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking::pending(
            "BK1".to_string(),
            Uuid::new_v4(),
            "agent@example.com".to_string(),
            vec!["Ada Lovelace".to_string(), "  ".to_string()],
            3,
            30_000,
        )
    }

    #[test]
    fn test_seat_transitions() {
        use SeatStatus::*;

        assert!(Available.can_transition_to(Locked));
        assert!(Locked.can_transition_to(Occupied));
        assert!(Locked.can_transition_to(Available));
        assert!(Occupied.can_transition_to(Available));

        assert!(!Available.can_transition_to(Occupied));
        assert!(!Occupied.can_transition_to(Locked));
        assert!(!Available.can_transition_to(Available));
    }

    #[test]
    fn test_passenger_name_placeholders() {
        let booking = booking();
        assert_eq!(booking.passenger_name(0), "Ada Lovelace");
        assert_eq!(booking.passenger_name(1), "Passenger 2");
        assert_eq!(booking.passenger_name(2), "Passenger 3");
    }

    #[test]
    fn test_booking_lifecycle() {
        let mut booking = booking();
        booking
            .confirm("K7QX2M".to_string(), "txn-1".to_string(), vec![])
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Success);

        // Cannot confirm twice
        assert!(booking.confirm("OTHER1".to_string(), "txn-2".to_string(), vec![]).is_err());

        assert_eq!(booking.cancel().unwrap(), BookingStatus::Confirmed);
        assert!(booking.awaits_refund());
        assert!(matches!(booking.cancel(), Err(BookingError::InvalidState(_))));

        booking.mark_refunded();
        assert!(!booking.awaits_refund());
    }

    #[test]
    fn test_failed_payment_cancels() {
        let mut booking = booking();
        booking.fail_payment().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment_status, PaymentStatus::Failed);
        assert!(booking.pnr.is_none());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(SeatStatus::Occupied.to_string(), "OCCUPIED");
        assert_eq!("REFUNDED".parse::<PaymentStatus>().unwrap(), PaymentStatus::Refunded);
        assert!("BOGUS".parse::<FlightStatus>().is_err());
    }
}
