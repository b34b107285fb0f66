pub mod allocation;
pub mod gateway;
pub mod guard;
pub mod orchestrator;
pub mod payment_client;
pub mod reaper;

pub use allocation::allocate_seats;
pub use gateway::{HttpPaymentGateway, MockPaymentGateway};
pub use guard::{LockHeartbeat, SeatLockGuard};
pub use orchestrator::{BookingOrchestrator, CreateBookingRequest, OrchestratorConfig};
pub use payment_client::{PaymentClient, PaymentClientConfig};
pub use reaper::StaleSeatReaper;
