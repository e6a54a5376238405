//! HealthCore server and admin commands.
//!
//! Run with: cargo run -p healthcore-web -- serve

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use healthcore_config::Config;
use healthcore_db::{Database, SessionRepository, UserRepository};
use healthcore_llm::{GeminiBackend, MedicalAssistant};
use healthcore_web::auth::hash_password_blocking;
use healthcore_web::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ENV_PASSWORD: &str = "HEALTHCORE_PASSWORD";

#[derive(Parser)]
#[command(name = "healthcore")]
#[command(about = "Clinical document agents backed by Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve,
    /// Apply database migrations and print row counts
    Migrate,
    /// Create a login; the password is read from HEALTHCORE_PASSWORD or the first line of stdin
    CreateUser {
        #[arg(long)]
        username: String,

        /// Grant staff rights
        #[arg(long)]
        staff: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("healthcore=debug,tower_http=info,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::CreateUser { username, staff } => create_user(&config, &username, staff).await,
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<Database>> {
    let db = Database::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("opening database {}", config.database.url))?;
    db.migrate().await.context("applying migrations")?;
    Ok(Arc::new(db))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("HealthCore starting, version {}", env!("CARGO_PKG_VERSION"));
    config.validate_for_serving()?;

    let db = open_database(&config).await?;
    let purged = SessionRepository::new(db.clone()).purge_expired().await?;
    if purged > 0 {
        info!(purged, "Expired sessions removed");
    }

    let backend = GeminiBackend::from_config(&config.llm).context("configuring Gemini backend")?;
    let assistant = MedicalAssistant::with_config(Arc::new(backend), &config.llm);
    info!(model = %assistant.model_id(), "LLM backend ready");

    let bind = config.server.bind.clone();
    let state = AppState::new(db.clone(), assistant, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("Server listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("HealthCore stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    let stats = db.stats().await?;
    println!(
        "Migrations applied. users={} documents={} audit_records={}",
        stats.users, stats.documents, stats.audit_records
    );
    db.close().await;
    Ok(())
}

async fn create_user(config: &Config, username: &str, staff: bool) -> anyhow::Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }

    let password = match std::env::var(ENV_PASSWORD) {
        Ok(p) if !p.is_empty() => p,
        _ => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).context("reading password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        bail!("no password given; set {ENV_PASSWORD} or pipe it on stdin");
    }

    let db = open_database(config).await?;
    let hash = hash_password_blocking(password).await?;
    let user = UserRepository::new(db.clone())
        .create(username, &hash, staff)
        .await
        .with_context(|| format!("creating user '{username}'"))?;
    println!("Created user '{}' (id {}, staff: {})", user.username, user.id, user.is_staff);
    db.close().await;
    Ok(())
}
