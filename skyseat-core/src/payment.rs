use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub booking_id: String,
    pub amount_nuc: i64,
    pub payment_method: String,
}

impl AuthorizeRequest {
    pub fn new(booking_id: impl Into<String>, amount_nuc: i64) -> Self {
        Self {
            booking_id: booking_id.into(),
            amount_nuc,
            payment_method: "CREDIT_CARD".to_string(),
        }
    }
}

/// Gateway answer to an authorize call. `success == false` is a decline, not
/// a transport failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment gateway timed out")]
    Timeout,

    #[error("Payment gateway unavailable (status {status:?}): {message}")]
    Transient { status: Option<u16>, message: String },

    #[error("Payment rejected by gateway (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl GatewayError {
    /// Timeouts, connection failures and 5xx answers are retried; 4xx are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Transient { .. })
    }
}

/// External payment processor. Implementations must treat repeated
/// `authorize` calls for the same booking id as the same request.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<PaymentReceipt, GatewayError>;

    async fn refund(&self, transaction_id: &str, amount_nuc: i64) -> Result<RefundReceipt, GatewayError>;
}
