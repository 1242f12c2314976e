use crate::error::BillingError;
use serde::Deserialize;

/// `BillingClient` is the seam between the handler and the billing provider.
/// The handler only needs the two creation calls; tests swap in a recording
/// implementation.
#[allow(async_fn_in_trait)]
pub trait BillingClient {
    /// Create a customer from an email address and a payment source token.
    async fn create_customer(&self, email: &str, source: &str) -> Result<Customer, BillingError>;

    /// Subscribe an existing customer to a plan.
    async fn create_subscription(
        &self,
        customer: &str,
        plan: &str,
    ) -> Result<Subscription, BillingError>;
}

/// `Customer` is the customer record returned by the billing API
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Customer {
    /// Remote customer identifier, e.g. `cus_...`
    pub id: String,
}

/// `Subscription` is the subscription record returned by the billing API
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Subscription {
    /// Remote subscription identifier, e.g. `sub_...`
    pub id: String,
}

const API_BASE: &str = "https://api.stripe.com/v1";

/// Thin HTTP client for the Stripe API.
#[derive(Clone, Debug)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    /// Create a client authenticated with the given secret key.
    pub fn new(secret_key: impl Into<String>) -> StripeClient {
        StripeClient {
            http: reqwest::Client::new(),
            api_base: API_BASE.to_owned(),
            secret_key: secret_key.into(),
        }
    }

    async fn post<T>(&self, path: &str, form: &[(&str, &str)]) -> Result<T, BillingError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let envelope: ApiErrorEnvelope = response.json().await?;
            Err(BillingError::Api(envelope.error.message))
        }
    }
}

impl BillingClient for StripeClient {
    #[tracing::instrument(skip(self, source))]
    async fn create_customer(&self, email: &str, source: &str) -> Result<Customer, BillingError> {
        self.post("/customers", &[("email", email), ("source", source)])
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_subscription(
        &self,
        customer: &str,
        plan: &str,
    ) -> Result<Subscription, BillingError> {
        self.post("/subscriptions", &[("customer", customer), ("plan", plan)])
            .await
    }
}

// Stripe reports failures as `{"error": {"message": ..., "type": ...}}`
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
