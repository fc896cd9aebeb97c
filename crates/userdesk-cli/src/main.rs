//! userdesk - command-line front end for the user-management API.
//!
//! Restores the saved session on start, then runs one command against it.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use userdesk_core::api::ApiClient;
use userdesk_core::auth::{HydrateOutcome, SessionCore, TokenStore};
use userdesk_core::config::{Config, TokenBackend, API_URL_ENV};

type Session = SessionCore<ApiClient, Box<dyn TokenStore>>;

#[derive(Parser, Debug)]
#[command(name = "userdesk", version, about = "Sign in and manage accounts on a userdesk server")]
struct Cli {
    /// API base URL, e.g. http://localhost:8080/api
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Where the session token is kept (file or keyring)
    #[arg(long, global = true)]
    token_store: Option<TokenBackend>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long, env = "USERDESK_EMAIL")]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long, env = "USERDESK_EMAIL")]
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show who is signed in
    Status,
    /// Show the signed-in profile
    Profile,
    /// Change name, email or password
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
    /// List every user
    Users,
    /// Show one user by id
    User { id: i64 },
    /// Delete a user by id
    DeleteUser { id: i64 },
}

impl Command {
    /// Commands that establish or drop a session skip the startup profile fetch.
    fn needs_hydration(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let log_guard = init_tracing(cli.log_file.as_ref())?;

    let mut config = Config::load()?;
    if let Some(backend) = cli.token_store {
        config.token_store = backend;
    }
    let base_url = cli.api_url.clone().unwrap_or_else(|| config.api_base_url());
    info!(%base_url, token_store = %config.token_store, "userdesk starting");

    let api = ApiClient::with_timeout(base_url, config.request_timeout())?;
    let session: Session = SessionCore::new(api, config.open_token_store()?);

    if cli.command.needs_hydration() && session.hydrate().await == HydrateOutcome::Invalidated {
        eprintln!("Saved session is no longer valid. Please log in again.");
    }

    let result = match cli.command {
        Command::Login { email } => commands::login(&session, &mut config, email).await,
        Command::Register { name, email } => {
            commands::register(&session, &mut config, &name, email).await
        }
        Command::Logout => commands::logout(&session),
        Command::Status => commands::status(&session),
        Command::Profile => commands::profile(&session).await,
        Command::Update {
            name,
            email,
            password,
        } => commands::update(&session, name, email, password).await,
        Command::Users => commands::users(&session).await,
        Command::User { id } => commands::user(&session, id).await,
        Command::DeleteUser { id } => commands::delete_user(&session, id).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
