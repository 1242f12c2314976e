use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use stripe_subscription_lambda::{handle_subscription, StripeClient, SubscriptionRequest};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let secret_key = std::env::var("STRIPE_SECRET_KEY")
        .expect("missing environment variable STRIPE_SECRET_KEY");
    let stripe = StripeClient::new(secret_key);

    run(service_fn(|event: LambdaEvent<SubscriptionRequest>| {
        handle_subscription(&stripe, event)
    }))
    .await
}
