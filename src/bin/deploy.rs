use clap::{Parser, Subcommand};
use std::path::Path;
use stripe_subscription_lambda::{
    pipeline::{self, Workspace},
    publisher::{self, AdminCredentials},
    DeployEnv, DeployError, FunctionConfig, FunctionParams, CONFIG_FILE,
};

#[derive(Parser)]
#[command(
    name = "deploy",
    about = "Package the Lambda function and upload it to every target region"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the previous build output and archive
    Clean,
    /// Build, test, and package the function without uploading it
    Build {
        /// Skip minification for faster local builds
        #[arg(long)]
        dev: bool,
    },
    /// Build, test, package, and upload the function to every region
    Deploy {
        /// Skip minification for faster local builds
        #[arg(long)]
        dev: bool,
    },
    /// Run the test suite
    Test,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let root = std::env::current_dir().expect("cannot determine the working directory");
    let workspace = Workspace::new(&root);

    let result = match cli.command {
        Commands::Clean => workspace.clean(),
        Commands::Build { dev } => build(&workspace, dev).await,
        Commands::Deploy { dev } => deploy(&workspace, &root, dev).await,
        Commands::Test => workspace.run_tests().await,
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn build(workspace: &Workspace, dev: bool) -> Result<(), DeployError> {
    let archive = pipeline::run_build(workspace, dev).await?;
    println!("Packaged artifact: {}", archive.display());
    Ok(())
}

async fn deploy(workspace: &Workspace, root: &Path, dev: bool) -> Result<(), DeployError> {
    // read the configuration up front so a missing lambda.json is
    // reported before any stage runs
    let config = FunctionConfig::load(&root.join(CONFIG_FILE))?;
    let env = DeployEnv::from_env()?;
    let params = FunctionParams::resolve(&config, &env)?;

    let archive = pipeline::run_build(workspace, dev).await?;
    let code = std::fs::read(archive)?;

    let credentials = AdminCredentials {
        access_key_id: env.access_key_id.clone(),
        secret_access_key: env.secret_access_key.clone(),
    };
    let clients = publisher::admin_clients(&env.regions, &credentials).await;
    let arns = publisher::publish_all(&clients, &params, &code).await?;

    println!("The function has been deployed. Its ARNs are:");
    for arn in arns {
        println!("{arn}");
    }
    Ok(())
}
