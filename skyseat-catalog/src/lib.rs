pub mod flights;
pub mod provisioning;

pub use flights::{CatalogError, FlightCatalog, NewFlight};
pub use provisioning::{seat_provisioning_queue, SeatProvisioner, SeatProvisioningQueue, SeatProvisioningRequest};
