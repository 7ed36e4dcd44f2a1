use crate::config::Config;
use crate::error::PaymentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// What the checkout API hands back for a new preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreference {
    pub preference_id: String,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_preference(&self, user_id: Uuid) -> Result<PaymentPreference, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
    sandbox_init_point: Option<String>,
}

pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: Option<String>,
    api_base: String,
    public_base_url: String,
    price_cents: i64,
}

impl MercadoPagoClient {
    pub fn new(config: &Config) -> Self {
        MercadoPagoClient {
            http: reqwest::Client::new(),
            access_token: config.mercado_pago_access_token.clone(),
            api_base: config.mercado_pago_api_base.clone(),
            public_base_url: config.public_base_url.clone(),
            price_cents: config.payment_price_cents,
        }
    }
}

/// Fixed-price, single-item preference referencing the paying identity.
pub fn preference_body(user_id: Uuid, price_cents: i64, public_base_url: &str) -> Value {
    let back_url = |outcome: &str| format!("{public_base_url}/dashboard?payment={outcome}");
    json!({
        "items": [{
            "title": "Participação na Votação",
            "description": "Pagamento para participar das votações",
            "quantity": 1,
            "currency_id": "BRL",
            "unit_price": price_cents as f64 / 100.0,
        }],
        "back_urls": {
            "success": back_url("success"),
            "failure": back_url("failure"),
            "pending": back_url("pending"),
        },
        "auto_return": "approved",
        "external_reference": user_id.to_string(),
        "payment_methods": {
            "excluded_payment_types": [],
            "installments": 12,
        },
    })
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(&self, user_id: Uuid) -> Result<PaymentPreference, PaymentError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(PaymentError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.api_base))
            .bearer_auth(token)
            .json(&preference_body(user_id, self.price_cents, &self.public_base_url))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mercado Pago API error: {}", body);
            return Err(PaymentError::Api(status.as_u16()));
        }

        let data: PreferenceResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(PaymentPreference {
            preference_id: data.id,
            init_point: data.init_point,
            sandbox_init_point: data.sandbox_init_point,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records calls and answers with a canned preference or failure.
    #[derive(Default)]
    pub struct FakeGateway {
        pub fail: bool,
        pub calls: Mutex<Vec<Uuid>>,
    }

    impl FakeGateway {
        pub fn failing() -> Self {
            FakeGateway {
                fail: true,
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_preference(
            &self,
            user_id: Uuid,
        ) -> Result<PaymentPreference, PaymentError> {
            self.calls.lock().unwrap().push(user_id);
            if self.fail {
                return Err(PaymentError::Api(500));
            }
            Ok(PaymentPreference {
                preference_id: format!("pref-{user_id}"),
                init_point: format!("https://checkout.example/pay/{user_id}"),
                sandbox_init_point: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_is_fixed_price_and_references_the_user() {
        let user = Uuid::new_v4();
        let body = preference_body(user, 250, "https://votacao.example");

        assert_eq!(body["items"][0]["unit_price"], json!(2.5));
        assert_eq!(body["items"][0]["currency_id"], "BRL");
        assert_eq!(body["items"][0]["quantity"], 1);
        assert_eq!(body["external_reference"], user.to_string());
        assert_eq!(
            body["back_urls"]["failure"],
            "https://votacao.example/dashboard?payment=failure"
        );
        assert_eq!(body["payment_methods"]["installments"], 12);
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let client = MercadoPagoClient::new(&Config::default());
        let err = client.create_preference(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured));
        assert_eq!(err.to_string(), "Mercado Pago access token not configured");
    }

    #[test]
    fn preference_serializes_in_camel_case() {
        let pref = PaymentPreference {
            preference_id: "p1".to_string(),
            init_point: "https://a".to_string(),
            sandbox_init_point: Some("https://b".to_string()),
        };
        let value = serde_json::to_value(&pref).unwrap();
        assert_eq!(value["preferenceId"], "p1");
        assert_eq!(value["initPoint"], "https://a");
        assert_eq!(value["sandboxInitPoint"], "https://b");
    }
}
