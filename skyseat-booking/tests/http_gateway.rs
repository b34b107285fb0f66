use serde_json::json;
use skyseat_booking::{HttpPaymentGateway, PaymentClient, PaymentClientConfig};
use skyseat_core::payment::{AuthorizeRequest, GatewayError, PaymentGateway};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_authorize_posts_booking_and_amount() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .and(body_json(json!({
            "bookingId": "BK1700000000000ABCDEF12",
            "amount": 50000,
            "paymentMethod": "CREDIT_CARD"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentId": "pay_123",
            "message": "Approved",
            "status": "SUCCESS"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpPaymentGateway::new(server.uri());
    let receipt = gateway
        .authorize(&AuthorizeRequest::new("BK1700000000000ABCDEF12", 50_000))
        .await
        .unwrap();

    assert!(receipt.success);
    assert_eq!(receipt.transaction_id, "pay_123");
    assert_eq!(receipt.message, "Approved");
}

#[tokio::test]
async fn test_failed_status_is_a_decline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentId": "pay_124",
            "message": "Card declined",
            "status": "FAILED"
        })))
        .mount(&server)
        .await;

    let receipt = HttpPaymentGateway::new(server.uri())
        .authorize(&AuthorizeRequest::new("BK2", 100))
        .await
        .unwrap();

    assert!(!receipt.success);
    assert_eq!(receipt.message, "Card declined");
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid card"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refund"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = HttpPaymentGateway::new(format!("{}/", server.uri()));

    match gateway.authorize(&AuthorizeRequest::new("BK3", 100)).await {
        Err(GatewayError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "invalid card");
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    let refund = gateway.refund("pay_1", 100).await;
    assert!(matches!(refund, Err(GatewayError::Transient { status: Some(503), .. })));
}

#[tokio::test]
async fn test_client_retries_server_errors_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refund"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = PaymentClient::new(
        Arc::new(HttpPaymentGateway::new(server.uri())),
        PaymentClientConfig {
            timeout: Duration::from_secs(2),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(1),
        },
    );

    let result = client.authorize(&AuthorizeRequest::new("BK4", 100)).await;
    assert!(matches!(result, Err(GatewayError::Transient { status: Some(500), .. })));

    let refund = client.refund("pay_1", 100).await;
    assert!(matches!(refund, Err(GatewayError::Rejected { status: 404, .. })));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refund"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "refundId": "rf_1", "message": "ok" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = PaymentClient::new(
        Arc::new(HttpPaymentGateway::new(server.uri())),
        PaymentClientConfig {
            timeout: Duration::from_millis(50),
            retry_attempts: 0,
            retry_backoff: Duration::from_millis(1),
        },
    );

    assert!(matches!(client.refund("pay_1", 100).await, Err(GatewayError::Timeout)));
}
