use skyseat_core::payment::{AuthorizeRequest, GatewayError, PaymentGateway, PaymentReceipt, RefundReceipt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct PaymentClientConfig {
    /// Upper bound for a single gateway call.
    pub timeout: Duration,
    /// Retries after the first attempt for timeouts and transient failures.
    pub retry_attempts: u32,
    /// Linear backoff step between retries.
    pub retry_backoff: Duration,
}

impl Default for PaymentClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// Wraps a [`PaymentGateway`] with a per-call timeout and bounded retries.
/// Authorize requests are resent unchanged, so the gateway sees the same
/// booking id on every attempt.
#[derive(Clone)]
pub struct PaymentClient {
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentClientConfig,
}

impl PaymentClient {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: PaymentClientConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn authorize(&self, request: &AuthorizeRequest) -> Result<PaymentReceipt, GatewayError> {
        self.call_with_retry("authorize", &request.booking_id, || self.gateway.authorize(request))
            .await
    }

    pub async fn refund(&self, transaction_id: &str, amount_nuc: i64) -> Result<RefundReceipt, GatewayError> {
        self.call_with_retry("refund", transaction_id, || self.gateway.refund(transaction_id, amount_nuc))
            .await
    }

    async fn call_with_retry<T, F, Fut>(&self, operation: &str, reference: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.config.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.config.retry_attempts => {
                    warn!(
                        "Payment {} for {} failed (attempt {} of {}): {}",
                        operation,
                        reference,
                        attempt,
                        self.config.retry_attempts + 1,
                        e
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    error!("Payment {} for {} gave up after {} attempts: {}", operation, reference, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
