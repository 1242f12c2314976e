use thiserror::Error as ThisError;

/// Different errors that the deploy tool can raise
#[derive(Debug, ThisError)]
pub enum DeployError {
    /// Error returned when the function configuration file is missing
    #[error("missing function configuration file {0}")]
    MissingConfig(String),
    /// Error returned when the function configuration file cannot be parsed
    #[error("invalid function configuration")]
    InvalidConfig(#[from] serde_json::Error),
    /// Error returned when a required environment variable is not set
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    /// Error returned when an external command exits with a failure status
    #[error("`{command}` failed with {status}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// The exit status it reported
        status: std::process::ExitStatus,
    },
    /// Error returned by filesystem operations in the pipeline
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Error returned while writing the deployment archive
    #[error("failed to write archive")]
    Archive(#[from] zip::result::ZipError),
    /// Error returned by the AWS Lambda API
    #[error("unexpected lambda api error")]
    Lambda(#[from] aws_sdk_lambda::Error),
    /// Error returned when a create or update response carries no function ARN
    #[error("no function ARN in the response for {0}")]
    MissingArn(String),
}

/// Different errors that the subscription handler can raise
#[derive(Debug, ThisError)]
pub enum BillingError {
    /// Error returned when the billing API cannot be reached
    #[error("billing request failed")]
    Http(#[from] reqwest::Error),
    /// Error reported by the billing API itself
    #[error("billing api error: {0}")]
    Api(String),
}
