//! Create-or-update publishing of the packaged function.
//!
//! Each region is handled with its own client so there is no shared remote
//! configuration between regions. The workflow is single-attempt: any remote
//! error other than the expected not-found during the existence check is
//! fatal for the run, with no retry and no rollback of regions that already
//! succeeded.

use crate::config::FunctionParams;
use crate::error::DeployError;
use aws_sdk_lambda::model::{FunctionCode, Runtime};
use aws_sdk_lambda::types::Blob;
use aws_sdk_lambda::{Client, Error};
use aws_types::region::Region;
use aws_types::Credentials;

/// Admin key pair used for every Lambda API call
#[derive(Clone, Debug)]
pub struct AdminCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

/// Build one Lambda client per target region, in the given order.
pub async fn admin_clients(regions: &[String], credentials: &AdminCredentials) -> Vec<Client> {
    let mut clients = Vec::with_capacity(regions.len());
    for region in regions {
        let config = aws_config::from_env()
            .region(Region::new(region.clone()))
            .credentials_provider(Credentials::from_keys(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
            ))
            .load()
            .await;
        clients.push(Client::new(&config));
    }
    clients
}

/// Publish the packaged code to every region. Regions are processed
/// concurrently; the returned ARN list preserves the input order. The first
/// unrecoverable error aborts the whole set.
pub async fn publish_all(
    clients: &[Client],
    params: &FunctionParams,
    code: &[u8],
) -> Result<Vec<String>, DeployError> {
    futures::future::try_join_all(
        clients
            .iter()
            .map(|client| publish_to_region(client, params, code)),
    )
    .await
}

/// Ensure the remote function in one region matches the desired
/// configuration, creating it where absent and updating it where present.
/// Returns the function ARN reported by the remote service.
#[tracing::instrument(skip(client, params, code))]
pub async fn publish_to_region(
    client: &Client,
    params: &FunctionParams,
    code: &[u8],
) -> Result<String, DeployError> {
    let res = client
        .get_function()
        .function_name(&params.function_name)
        .send()
        .await;

    let deployed = match res {
        // a response without code attached is treated the same as not found
        Ok(output) => output.code.is_some(),
        Err(sdk_err) => {
            let err = sdk_err.into();
            match err {
                Error::ResourceNotFoundException(_) => false,
                _ => {
                    tracing::error!(error = %err, "existence check failed");
                    return Err(DeployError::Lambda(err));
                }
            }
        }
    };

    if deployed {
        update_function(client, params, code).await
    } else {
        create_function(client, params, code).await
    }
}

async fn create_function(
    client: &Client,
    params: &FunctionParams,
    code: &[u8],
) -> Result<String, DeployError> {
    tracing::info!(?params, "uploading new function");

    let output = client
        .create_function()
        .code(FunctionCode::builder().zip_file(Blob::new(code)).build())
        .function_name(&params.function_name)
        .handler(&params.handler)
        .role(&params.role)
        .runtime(Runtime::from(params.runtime.as_str()))
        .description(&params.description)
        .memory_size(params.memory_size)
        .timeout(params.timeout)
        .send()
        .await
        .map_err(Error::from)?;

    output
        .function_arn
        .ok_or_else(|| DeployError::MissingArn(params.function_name.clone()))
}

async fn update_function(
    client: &Client,
    params: &FunctionParams,
    code: &[u8],
) -> Result<String, DeployError> {
    tracing::info!(function_name = %params.function_name, "updating existing function code");

    // the configuration update must not run if the code update failed
    client
        .update_function_code()
        .function_name(&params.function_name)
        .zip_file(Blob::new(code))
        .send()
        .await
        .map_err(Error::from)?;

    tracing::info!(?params, "updating existing function configuration");

    let output = client
        .update_function_configuration()
        .function_name(&params.function_name)
        .handler(&params.handler)
        .role(&params.role)
        .description(&params.description)
        .memory_size(params.memory_size)
        .timeout(params.timeout)
        .send()
        .await
        .map_err(Error::from)?;

    output
        .function_arn
        .ok_or_else(|| DeployError::MissingArn(params.function_name.clone()))
}
