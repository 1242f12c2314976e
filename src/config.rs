use crate::error::DeployError;
use serde::Deserialize;
use std::path::Path;

/// Name of the local function configuration file
pub const CONFIG_FILE: &str = "lambda.json";

/// Handler used when the configuration file does not name one
pub const DEFAULT_HANDLER: &str = "index.handler";

/// Description used when the configuration file does not supply one
pub const DEFAULT_DESCRIPTION: &str =
    "A Lambda function that was created with the JAWS framework";

/// `FunctionConfig` is the function configuration read from `lambda.json`.
/// The file uses the same PascalCase field names as the Lambda API.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionConfig {
    /// Name of the remote function
    pub function_name: String,
    /// Entry point of the function, defaults to `index.handler`
    pub handler: Option<String>,
    /// Execution role ARN, falls back to `AWS_LAMBDA_ROLE_ARN`
    pub role: Option<String>,
    /// Runtime identifier, e.g. `nodejs`
    pub runtime: String,
    /// Free-text description, defaults to a fixed text
    pub description: Option<String>,
    /// Memory limit in megabytes
    pub memory_size: i32,
    /// Timeout in seconds
    pub timeout: i32,
}

impl FunctionConfig {
    /// Read the function configuration from a local file.
    /// A missing file is reported as its own error so the caller can
    /// tell the user which file to create.
    pub fn load(path: &Path) -> Result<FunctionConfig, DeployError> {
        if !path.exists() {
            return Err(DeployError::MissingConfig(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// `DeployEnv` carries the deploy settings sourced from environment variables
#[derive(Clone, Debug)]
pub struct DeployEnv {
    /// Target regions, in the order they were listed
    pub regions: Vec<String>,
    /// Admin access key id used for every Lambda API call
    pub access_key_id: String,
    /// Admin secret access key
    pub secret_access_key: String,
    /// Execution role ARN used when the configuration omits one
    pub role_arn: Option<String>,
    /// Function name override; takes precedence over the configuration
    pub function_name: Option<String>,
}

impl DeployEnv {
    /// Collect the deploy environment from the process environment.
    pub fn from_env() -> Result<DeployEnv, DeployError> {
        Ok(DeployEnv {
            regions: parse_regions(&required("AWS_LAMBDA_REGIONS")?),
            access_key_id: required("AWS_ADMIN_ACCESS_KEY")?,
            secret_access_key: required("AWS_ADMIN_SECRET_ACCESS_KEY")?,
            role_arn: std::env::var("AWS_LAMBDA_ROLE_ARN").ok(),
            function_name: std::env::var("AWS_LAMBDA_FUNCTIONNAME").ok(),
        })
    }
}

fn required(name: &'static str) -> Result<String, DeployError> {
    std::env::var(name).map_err(|_| DeployError::MissingEnv(name))
}

fn parse_regions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `FunctionParams` is the effective configuration sent to the Lambda API,
/// with the environment overrides and fallback defaults already applied.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParams {
    /// Effective function name
    pub function_name: String,
    /// Effective handler
    pub handler: String,
    /// Effective execution role ARN
    pub role: String,
    /// Runtime identifier
    pub runtime: String,
    /// Effective description
    pub description: String,
    /// Memory limit in megabytes
    pub memory_size: i32,
    /// Timeout in seconds
    pub timeout: i32,
}

impl FunctionParams {
    /// Merge the file configuration with the environment. The environment
    /// wins for the function name; the role falls back to the environment
    /// when the file omits it.
    pub fn resolve(config: &FunctionConfig, env: &DeployEnv) -> Result<FunctionParams, DeployError> {
        let role = match config.role.clone().or_else(|| env.role_arn.clone()) {
            Some(role) => role,
            None => return Err(DeployError::MissingEnv("AWS_LAMBDA_ROLE_ARN")),
        };

        Ok(FunctionParams {
            function_name: env
                .function_name
                .clone()
                .unwrap_or_else(|| config.function_name.clone()),
            handler: config
                .handler
                .clone()
                .unwrap_or_else(|| DEFAULT_HANDLER.to_owned()),
            role,
            runtime: config.runtime.clone(),
            description: config
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned()),
            memory_size: config.memory_size,
            timeout: config.timeout,
        })
    }
}
