use serde::{Deserialize, Serialize};

/// `SubscriptionRequest` is the payload the function is invoked with
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SubscriptionRequest {
    /// Customer email address
    pub email: String,
    /// Payment source token for the card on file
    pub cc: String,
    /// Identifier of the plan to subscribe the customer to
    pub plan: String,
}

/// `SubscriptionResponse` is the payload returned on success
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SubscriptionResponse {
    /// Identifier of the customer that was created
    pub customer: String,
    /// Always true; failures are reported as invocation errors instead
    pub success: bool,
}
