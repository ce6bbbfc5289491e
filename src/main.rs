use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use authd::api::{self, AppState};
use authd::auth::{AccessGuard, AuthService, TokenIssuer};
use authd::config::AppConfig;
use authd::db::Database;
use authd::oidc::GoogleOidcClient;
use authd::token::RefreshTokenRepository;
use authd::user::UserRepository;

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    // Load .env before clap so env-sourced defaults see it.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(cmd) => run_serve(config, cmd),
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "authd - token-based authentication service")]
struct Cli {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
}

#[derive(Debug, Args)]
struct ServeCommand {
    /// Override the listen address (e.g. 0.0.0.0:8080)
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
}

fn init_logging(cli: &Cli) {
    let default_directive = if cli.quiet {
        "authd=error"
    } else {
        match cli.verbose {
            0 => "authd=info,tower_http=info",
            1 => "authd=debug,tower_http=debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn run_serve(config: AppConfig, cmd: ServeCommand) -> Result<()> {
    config.validate()?;

    info!("Starting authd...");
    let db = Database::connect(&config.database.url).await?;

    let issuer = TokenIssuer::from_config(&config.auth)?;
    let users = UserRepository::new(db.pool().clone());
    let tokens = RefreshTokenRepository::new(db.pool().clone());

    let auth = AuthService::new(users.clone(), tokens, issuer.clone());
    let guard = AccessGuard::new(users, issuer);

    let oidc = if config.oidc.is_configured() {
        Some(GoogleOidcClient::from_config(&config.oidc)?)
    } else {
        info!("Federated login disabled: oidc is not fully configured");
        None
    };

    let state = AppState::new(auth, guard, oidc, config.server.allowed_origins.clone());
    let app = api::create_router(state);

    let listen = cmd.listen.unwrap_or(config.server.listen);
    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("binding {}", listen))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
