use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cognito_gateway_cli::cli::Cli;
use cognito_gateway_cli::{
    CognitoAuthenticator, IdentityPoolExchanger, Pipeline, Settings, SignedApiInvoker,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    // Progress goes to stderr; stdout carries only the result dump.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let settings = Settings::from_cli(Cli::parse())?;

    let pipeline = Pipeline::new(
        CognitoAuthenticator::new(settings.directory).await,
        IdentityPoolExchanger::new(settings.pool).await,
        SignedApiInvoker::new(settings.endpoint, settings.access_token_header),
    );

    let result = pipeline.run(&settings.login, &settings.request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
