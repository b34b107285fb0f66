use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use skyseat_core::payment::{AuthorizeRequest, GatewayError, PaymentGateway, PaymentReceipt, RefundReceipt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessPaymentBody<'a> {
    booking_id: &'a str,
    amount: i64,
    payment_method: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessPaymentResponse {
    payment_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundBody<'a> {
    payment_id: &'a str,
    amount: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundResponse {
    refund_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// JSON-over-HTTP payment processor: `POST {base}/process` and
/// `POST {base}/refund`.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => response.json::<R>().await.map_err(|e| GatewayError::Transient {
                status: Some(status.as_u16()),
                message: format!("unreadable gateway response: {}", e),
            }),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                Err(GatewayError::Transient { status: Some(status), message })
            }
            status if status.is_client_error() => {
                let message = response.text().await.unwrap_or_default();
                Err(GatewayError::Rejected { status: status.as_u16(), message })
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(GatewayError::Transient { status: Some(status.as_u16()), message })
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transient { status: None, message: e.to_string() }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<PaymentReceipt, GatewayError> {
        let body = ProcessPaymentBody {
            booking_id: &request.booking_id,
            amount: request.amount_nuc,
            payment_method: &request.payment_method,
        };
        let response: ProcessPaymentResponse = self.post("/process", &body).await?;

        // A 2xx without a payment id, or with an explicit non-success status, is a decline
        let approved = response.payment_id.is_some()
            && response
                .status
                .as_deref()
                .map_or(true, |status| status.eq_ignore_ascii_case("SUCCESS"));

        Ok(PaymentReceipt {
            transaction_id: response.payment_id.unwrap_or_default(),
            success: approved,
            message: response.message.unwrap_or_default(),
        })
    }

    async fn refund(&self, transaction_id: &str, amount_nuc: i64) -> Result<RefundReceipt, GatewayError> {
        let body = RefundBody {
            payment_id: transaction_id,
            amount: amount_nuc,
        };
        let response: RefundResponse = self.post("/refund", &body).await?;

        Ok(RefundReceipt {
            success: response.refund_id.is_some(),
            refund_id: response.refund_id.unwrap_or_default(),
            message: response.message.unwrap_or_default(),
        })
    }
}

/// Deterministic in-process gateway for local runs and tests.
pub struct MockPaymentGateway {
    approve: bool,
    decline_message: String,
    delay: Duration,
    failures: Mutex<VecDeque<GatewayError>>,
    refund_failure: Mutex<Option<GatewayError>>,
    authorize_calls: AtomicUsize,
    refund_calls: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn approving() -> Self {
        Self {
            approve: true,
            decline_message: String::new(),
            delay: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            refund_failure: Mutex::new(None),
            authorize_calls: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
        }
    }

    pub fn declining(message: impl Into<String>) -> Self {
        Self {
            approve: false,
            decline_message: message.into(),
            ..Self::approving()
        }
    }

    /// Errors returned by the next authorize calls, in order.
    pub fn with_failures(self, failures: Vec<GatewayError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..self
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Every refund fails with `error` until cleared with `None`.
    pub async fn fail_refunds(&self, error: Option<GatewayError>) {
        *self.refund_failure.lock().await = error;
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn refund_calls(&self) -> usize {
        self.refund_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<PaymentReceipt, GatewayError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }

        if self.approve {
            Ok(PaymentReceipt {
                // Same booking id, same transaction
                transaction_id: format!("mock_txn_{}", request.booking_id),
                success: true,
                message: "Payment approved".to_string(),
            })
        } else {
            Ok(PaymentReceipt {
                transaction_id: String::new(),
                success: false,
                message: self.decline_message.clone(),
            })
        }
    }

    async fn refund(&self, transaction_id: &str, _amount_nuc: i64) -> Result<RefundReceipt, GatewayError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.refund_failure.lock().await.clone() {
            return Err(error);
        }

        Ok(RefundReceipt {
            refund_id: format!("mock_rf_{}", transaction_id),
            success: true,
            message: "Refund processed".to_string(),
        })
    }
}
