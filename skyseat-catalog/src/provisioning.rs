use serde::{Deserialize, Serialize};
use skyseat_core::ids::seat_code;
use skyseat_core::models::Seat;
use skyseat_core::repository::{InventoryStore, StoreError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Notification that a flight needs its seat rows created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatProvisioningRequest {
    pub flight_id: Uuid,
    pub max_passengers: i32,
}

/// Sending half of the provisioning queue. Publishing is fire-and-forget:
/// the caller never waits for seats to exist.
#[derive(Clone)]
pub struct SeatProvisioningQueue {
    tx: mpsc::Sender<SeatProvisioningRequest>,
}

pub fn seat_provisioning_queue(capacity: usize) -> (SeatProvisioningQueue, mpsc::Receiver<SeatProvisioningRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SeatProvisioningQueue { tx }, rx)
}

impl SeatProvisioningQueue {
    /// Returns whether the notification was handed to the worker.
    pub async fn publish(&self, request: SeatProvisioningRequest) -> bool {
        let flight_id = request.flight_id;
        match self.tx.send(request).await {
            Ok(()) => {
                info!("Queued seat provisioning for flight {}", flight_id);
                true
            }
            Err(e) => {
                error!("Seat provisioning queue closed, flight {} has no seats: {}", flight_id, e);
                false
            }
        }
    }
}

/// Consumes provisioning notifications and bulk-creates seat rows.
pub struct SeatProvisioner {
    store: Arc<dyn InventoryStore>,
    seats_per_row: usize,
}

impl SeatProvisioner {
    pub fn new(store: Arc<dyn InventoryStore>, seats_per_row: usize) -> Self {
        Self {
            store,
            seats_per_row: seats_per_row.max(1),
        }
    }

    /// Cabin layout for a flight: `max_passengers` seats, row by row.
    pub fn layout(&self, flight_id: Uuid, max_passengers: i32) -> Vec<Seat> {
        (0..max_passengers.max(0) as usize)
            .map(|index| Seat::new(flight_id, seat_code(index, self.seats_per_row)))
            .collect()
    }

    /// Idempotent: seats that already exist are skipped.
    pub async fn provision(&self, request: &SeatProvisioningRequest) -> Result<usize, StoreError> {
        let seats = self.layout(request.flight_id, request.max_passengers);
        let created = self.store.insert_seats(&seats).await?;
        if created < seats.len() {
            warn!(
                "Flight {} already had {} of {} seats",
                request.flight_id,
                seats.len() - created,
                seats.len()
            );
        }
        info!("Provisioned {} seats for flight {}", created, request.flight_id);
        Ok(created)
    }

    pub async fn run(self, mut rx: mpsc::Receiver<SeatProvisioningRequest>) {
        info!("Seat provisioning worker started");

        while let Some(request) = rx.recv().await {
            if let Err(e) = self.provision(&request).await {
                error!("Failed to provision seats for flight {}: {}", request.flight_id, e);
            }
        }

        info!("Seat provisioning worker stopped, queue closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyseat_core::repository::SeatRepository;
    use skyseat_store::InMemoryStore;

    #[test]
    fn test_layout_rows_of_six() {
        let store: Arc<dyn InventoryStore> = Arc::new(InMemoryStore::new());
        let provisioner = SeatProvisioner::new(store, 6);
        let flight_id = Uuid::new_v4();

        let codes: Vec<String> = provisioner
            .layout(flight_id, 8)
            .into_iter()
            .map(|seat| seat.seat_code)
            .collect();

        assert_eq!(codes, vec!["A1", "A2", "A3", "A4", "A5", "A6", "B1", "B2"]);
    }

    #[tokio::test]
    async fn test_worker_provisions_queued_flights() {
        let store = Arc::new(InMemoryStore::new());
        let (queue, rx) = seat_provisioning_queue(8);
        let worker = tokio::spawn(SeatProvisioner::new(store.clone(), 6).run(rx));

        let flight_id = Uuid::new_v4();
        let request = SeatProvisioningRequest { flight_id, max_passengers: 4 };
        assert!(queue.publish(request.clone()).await);
        // Duplicate delivery must not create extra rows
        assert!(queue.publish(request).await);

        drop(queue);
        worker.await.unwrap();

        let seats = store.list_seats(flight_id).await.unwrap();
        assert_eq!(seats.len(), 4);
        assert!(seats.iter().all(|seat| seat.is_available()));
    }
}
