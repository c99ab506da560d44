use diesel::sql_types::VarChar;

/// Stripe PaymentIntent id, e.g. `pi_1Gqj58...`
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, From, FromStr, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct PaymentIntentId(String);
derive_newtype_sql!(payment_intent_id_sql, VarChar, PaymentIntentId, PaymentIntentId);

impl PaymentIntentId {
    pub fn new(id: String) -> Self {
        PaymentIntentId(id)
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Other,
}
