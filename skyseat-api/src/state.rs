use skyseat_booking::BookingOrchestrator;
use skyseat_catalog::FlightCatalog;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<FlightCatalog>,
    pub bookings: Arc<BookingOrchestrator>,
}

impl AppState {
    pub fn new(catalog: FlightCatalog, bookings: BookingOrchestrator) -> Self {
        Self {
            catalog: Arc::new(catalog),
            bookings: Arc::new(bookings),
        }
    }
}
