#![deny(missing_docs)]
//! <fullname>Stripe subscription Lambda</fullname>
//!
//! Lambda function that creates a Stripe customer and subscribes
//! it to a plan, together with the deploy tool that packages the
//! function and uploads it to AWS Lambda in every target region.
use lambda_runtime::LambdaEvent;

mod config;
pub use config::{DeployEnv, FunctionConfig, FunctionParams, CONFIG_FILE};

mod error;
pub use error::{BillingError, DeployError};

mod event;
pub use event::{SubscriptionRequest, SubscriptionResponse};

pub mod pipeline;
pub mod publisher;

mod stripe;
pub use stripe::{BillingClient, Customer, StripeClient, Subscription};

#[cfg(test)]
mod test_util;

/// `handle_subscription` is the Lambda function entry point: create the
/// customer, then subscribe it to the requested plan. The first failing
/// call is the invocation's failure. If the subscription call fails the
/// already-created customer is left in place; there is no compensating
/// deletion.
#[tracing::instrument(skip(billing, event))]
pub async fn handle_subscription<B: BillingClient>(
    billing: &B,
    event: LambdaEvent<SubscriptionRequest>,
) -> Result<SubscriptionResponse, BillingError> {
    let request = event.payload;

    let customer = billing.create_customer(&request.email, &request.cc).await?;
    billing
        .create_subscription(&customer.id, &request.plan)
        .await?;

    Ok(SubscriptionResponse {
        customer: customer.id,
        success: true,
    })
}
