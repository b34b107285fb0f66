use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use skyseat_api::{app, AppState};
use skyseat_booking::{BookingOrchestrator, MockPaymentGateway, OrchestratorConfig, PaymentClient, PaymentClientConfig};
use skyseat_catalog::{seat_provisioning_queue, FlightCatalog, SeatProvisioner};
use skyseat_store::{InMemoryLockService, InMemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_app(gateway: MockPaymentGateway) -> Router {
    let store = Arc::new(InMemoryStore::new());
    let locks = Arc::new(InMemoryLockService::new(Duration::from_secs(60)));

    let (queue, rx) = seat_provisioning_queue(16);
    tokio::spawn(SeatProvisioner::new(store.clone(), 6).run(rx));

    let payments = PaymentClient::new(Arc::new(gateway), PaymentClientConfig::default());
    let catalog = FlightCatalog::new(store.clone(), queue);
    let orchestrator = BookingOrchestrator::new(store, locks, payments, OrchestratorConfig::default());

    app(AppState::new(catalog, orchestrator))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Adds a flight and waits for the provisioning worker to create its seats.
async fn add_flight(app: &Router, seats: i32) -> String {
    let (status, flight) = send(
        app,
        "POST",
        "/v1/flights/admin/add",
        Some(json!({
            "flight_number": "SK 1001",
            "origin": "CPH",
            "destination": "LHR",
            "flight_metadata": null,
            "departure_time": "2026-12-05T08:00:00Z",
            "arrival_time": "2026-12-05T10:05:00Z",
            "price_nuc": 15000,
            "max_passengers": seats
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(flight["status"], "SCHEDULED");
    let id = flight["id"].as_str().unwrap().to_string();

    for _ in 0..100 {
        let (_, seat_map) = send(app, "GET", &format!("/v1/flights/{}/seats", id), None).await;
        if seat_map.as_array().map_or(0, Vec::len) == seats as usize {
            return id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("seats for flight {} were never provisioned", id);
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = test_app(MockPaymentGateway::approving());
    let flight_id = add_flight(&app, 4).await;

    let (status, booking) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(json!({
            "flight_id": flight_id,
            "number_of_passengers": 2,
            "pax_details": "Ada Lovelace, Alan Turing",
            "booked_by": "ada@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "CONFIRMED");
    assert_eq!(booking["payment_status"], "SUCCESS");
    assert_eq!(booking["seats"][0]["seat_code"], "A1");
    assert_eq!(booking["seats"][1]["passenger_name"], "Alan Turing");

    let booking_id = booking["booking_id"].as_str().unwrap().to_string();
    let pnr = booking["pnr"].as_str().unwrap().to_string();

    let (status, by_pnr) = send(&app, "GET", &format!("/v1/bookings/pnr/{}", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_pnr["booking_id"], booking_id.as_str());

    let (_, flight) = send(&app, "GET", &format!("/v1/flights/{}", flight_id), None).await;
    assert_eq!(flight["available_seats"], 2);

    let (status, mine) = send(&app, "GET", "/v1/bookings/user/ada@example.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, cancelled) = send(&app, "PUT", &format!("/v1/bookings/{}/cancel", booking_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["payment_status"], "REFUNDED");

    let (status, body) = send(&app, "PUT", &format!("/v1/bookings/{}/cancel", booking_id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("already cancelled"));

    let (_, flight) = send(&app, "GET", &format!("/v1/flights/{}", flight_id), None).await;
    assert_eq!(flight["available_seats"], 4);
}

#[tokio::test]
async fn test_error_mapping() {
    let app = test_app(MockPaymentGateway::declining("card declined"));
    let flight_id = add_flight(&app, 2).await;

    let booking = |passengers: i32| {
        json!({
            "flight_id": flight_id,
            "number_of_passengers": passengers,
            "booked_by": "agent@example.com"
        })
    };

    let (status, _) = send(&app, "POST", "/v1/bookings", Some(booking(3))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/v1/bookings", Some(booking(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/v1/bookings", Some(booking(1))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("card declined"));

    let (status, _) = send(&app, "GET", "/v1/bookings/BK0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "GET", &format!("/v1/flights/{}", unknown), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flight_search_and_status() {
    let app = test_app(MockPaymentGateway::approving());
    let flight_id = add_flight(&app, 3).await;

    let search = json!({ "origin": "cph", "destination": "lhr", "date": "2026-12-05", "passengers": 2 });
    let (status, found) = send(&app, "POST", "/v1/flights/search", Some(search.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, flight) = send(
        &app,
        "PUT",
        &format!("/v1/flights/admin/{}/status", flight_id),
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flight["status"], "CANCELLED");

    let (_, found) = send(&app, "POST", "/v1/flights/search", Some(search)).await;
    assert!(found.as_array().unwrap().is_empty());

    let (status, flights) = send(&app, "GET", "/v1/flights", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flights.as_array().unwrap().len(), 1);
}
