pub mod error;
pub mod ids;
pub mod lock;
pub mod models;
pub mod payment;
pub mod repository;

pub use error::{BookingError, BookingResult, ErrorKind};
pub use lock::{LockError, LockToken, SeatLockService};
pub use models::{
    Booking, BookingSeat, BookingStatus, Flight, FlightStatus, PaymentStatus, Seat, SeatStatus,
};
pub use payment::{AuthorizeRequest, GatewayError, PaymentGateway, PaymentReceipt, RefundReceipt};
pub use repository::{
    BookingRepository, FlightRepository, InventoryStore, SeatRepository, StoreError,
};
