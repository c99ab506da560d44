use std::collections::BTreeMap;

use models::{Amount, PaymentIntentId, PaymentIntentStatus};

pub type Metadata = BTreeMap<String, String>;

/// Form parameters of `POST /payment_intents`
#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentIntent {
    pub amount: Amount,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metadata: Metadata,
    /// Sent as the `Idempotency-Key` header, so a retried call creates one intent
    #[serde(skip)]
    pub idempotency_key: String,
}

/// The fields of a Stripe PaymentIntent the service reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub client_secret: Option<String>,
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}
