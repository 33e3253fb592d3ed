//! `saml-sp` entry point.

#![forbid(unsafe_code)]

use clap::Parser;
use sp_cli::{
    cli::{Cli, Command},
    commands::{
        run_authorize_form, run_authorize_url, run_decode, run_logout_url, run_metadata,
        run_validate_response,
    },
    config::CliConfig,
    output, CliResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(&cli.config)?;

    match cli.command {
        Command::Metadata {
            decryption_cert,
            signing_cert,
        } => run_metadata(&config, decryption_cert, signing_cert).await,
        Command::AuthorizeUrl {
            relay_state,
            host,
            params,
        } => run_authorize_url(&config, relay_state.as_deref(), host.as_deref(), params).await,
        Command::AuthorizeForm { relay_state, host } => {
            run_authorize_form(&config, relay_state.as_deref(), host.as_deref()).await
        }
        Command::LogoutUrl {
            name_id,
            format,
            session_index,
            relay_state,
        } => {
            let relay_state = relay_state.as_deref();
            run_logout_url(&config, &name_id, format, session_index, relay_state).await
        }
        Command::Decode { message } => run_decode(&message),
        Command::ValidateResponse { response } => {
            run_validate_response(&config, &response, cli.output).await
        }
    }
}
