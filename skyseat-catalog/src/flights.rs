use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use skyseat_core::ids::compare_seat_codes;
use skyseat_core::models::{Flight, FlightStatus, Seat};
use skyseat_core::repository::{InventoryStore, StoreError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::provisioning::{SeatProvisioningQueue, SeatProvisioningRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub flight_metadata: Option<String>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price_nuc: i64,
    pub max_passengers: i32,
}

impl NewFlight {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.flight_number.trim().is_empty() {
            return Err(CatalogError::Validation("flight number is required".into()));
        }
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(CatalogError::Validation("origin and destination are required".into()));
        }
        if self.arrival_time <= self.departure_time {
            return Err(CatalogError::Validation("arrival must be after departure".into()));
        }
        if self.price_nuc <= 0 {
            return Err(CatalogError::Validation("price must be greater than 0".into()));
        }
        if self.max_passengers < 1 {
            return Err(CatalogError::Validation("max passengers must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Flight not found: {0}")]
    NotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Flight inventory: creation, lookup and search. Seat rows are created
/// asynchronously by the provisioning worker.
pub struct FlightCatalog {
    store: Arc<dyn InventoryStore>,
    provisioning: SeatProvisioningQueue,
}

impl FlightCatalog {
    pub fn new(store: Arc<dyn InventoryStore>, provisioning: SeatProvisioningQueue) -> Self {
        Self { store, provisioning }
    }

    pub async fn add_flight(&self, request: NewFlight) -> Result<Flight, CatalogError> {
        request.validate()?;

        let now = Utc::now();
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: request.flight_number.trim().to_string(),
            origin: request.origin.trim().to_uppercase(),
            destination: request.destination.trim().to_uppercase(),
            flight_metadata: request.flight_metadata,
            departure_time: request.departure_time,
            arrival_time: request.arrival_time,
            status: FlightStatus::Scheduled,
            price_nuc: request.price_nuc,
            max_passengers: request.max_passengers,
            available_seats: request.max_passengers,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_flight(&flight).await?;
        info!("Flight {} ({}) created: {} -> {}", flight.flight_number, flight.id, flight.origin, flight.destination);

        self.provisioning
            .publish(SeatProvisioningRequest {
                flight_id: flight.id,
                max_passengers: flight.max_passengers,
            })
            .await;

        Ok(flight)
    }

    pub async fn get_flight(&self, id: Uuid) -> Result<Flight, CatalogError> {
        self.store.get_flight(id).await?.ok_or(CatalogError::NotFound(id))
    }

    pub async fn list_flights(&self) -> Result<Vec<Flight>, CatalogError> {
        Ok(self.store.list_flights().await?)
    }

    pub async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        passengers: i32,
    ) -> Result<Vec<Flight>, CatalogError> {
        if passengers < 1 {
            return Err(CatalogError::Validation("passengers must be at least 1".into()));
        }
        Ok(self
            .store
            .search_flights(origin.trim(), destination.trim(), date, passengers)
            .await?)
    }

    pub async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> Result<Flight, CatalogError> {
        let flight = self
            .store
            .update_flight_status(id, status)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        info!("Flight {} status set to {}", id, status);
        Ok(flight)
    }

    /// Seat map in allocation order.
    pub async fn list_seats(&self, flight_id: Uuid) -> Result<Vec<Seat>, CatalogError> {
        self.get_flight(flight_id).await?;
        let mut seats = self.store.list_seats(flight_id).await?;
        seats.sort_by(|a, b| compare_seat_codes(&a.seat_code, &b.seat_code));
        Ok(seats)
    }
}
