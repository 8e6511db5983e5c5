use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use tracing::{error, info};

use crate::models::enums::PaymentStatus;
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: PaymentStatus,
    pub amount_cents: i64,
}

/// Processeur de paiement externe (factures et financement participatif)
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent, AppError>;

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, AppError>;
}

/// Montant en centimes, arrondi au centime
pub fn to_cents(amount: Decimal) -> Result<i64, AppError> {
    (amount.round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| AppError::Validation(format!("Amount out of range: {}", amount)))
}

// ---------------------------------------------------------------- Stripe

const STRIPE_API: &str = "https://api.stripe.com/v1";

pub struct StripePaymentProcessor {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
}

impl StripeIntent {
    fn into_intent(self) -> PaymentIntent {
        let status = match self.status.as_str() {
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        };
        PaymentIntent {
            id: self.id,
            client_secret: self.client_secret,
            status,
            amount_cents: self.amount,
        }
    }
}

impl StripePaymentProcessor {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: STRIPE_API.to_string(),
        }
    }

    async fn parse(response: reqwest::Response) -> Result<PaymentIntent, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "payment processor rejected the request");
            return Err(AppError::Payment(format!("processor returned {}", status)));
        }
        response
            .json::<StripeIntent>()
            .await
            .map(StripeIntent::into_intent)
            .map_err(|e| AppError::Payment(e.to_string()))
    }
}

#[async_trait]
impl PaymentProcessor for StripePaymentProcessor {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent, AppError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), to_cents(amount)?.to_string()),
            ("currency".to_string(), currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        Self::parse(response).await
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{}", self.base_url, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        Self::parse(response).await
    }
}

// ---------------------------------------------------------------- en mémoire

/// Processeur local pour le développement et les tests.
/// Avec `auto_confirm`, chaque intention est immédiatement réglée.
pub struct InMemoryPaymentProcessor {
    auto_confirm: bool,
    intents: Mutex<HashMap<String, PaymentIntent>>,
}

impl InMemoryPaymentProcessor {
    pub fn new(auto_confirm: bool) -> Self {
        Self {
            auto_confirm,
            intents: Mutex::new(HashMap::new()),
        }
    }

    /// Simule le retour du processeur pour une intention existante
    pub fn settle(&self, id: &str, status: PaymentStatus) -> Result<(), AppError> {
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| AppError::Internal("payment registry poisoned".to_string()))?;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("payment intent {}", id)))?;
        intent.status = status;
        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        _metadata: &[(&str, String)],
    ) -> Result<PaymentIntent, AppError> {
        let id = format!("pi_{}", uuid::Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id: id.clone(),
            status: if self.auto_confirm {
                PaymentStatus::Succeeded
            } else {
                PaymentStatus::Pending
            },
            amount_cents: to_cents(amount)?,
        };

        self.intents
            .lock()
            .map_err(|_| AppError::Internal("payment registry poisoned".to_string()))?
            .insert(id.clone(), intent.clone());

        info!(intent = %id, %amount, currency, "payment intent created (in-memory)");
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        self.intents
            .lock()
            .map_err(|_| AppError::Internal("payment registry poisoned".to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("payment intent {}", id)))
    }
}
