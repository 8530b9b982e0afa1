mod accounts;
mod applications;
mod companies;
mod config;
mod db;
mod errors;
mod gmail;
mod h1b;
mod internships;
mod jobgpt;
mod jobs;
mod llm_client;
mod models;
mod pagination;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::{extract::Request, ServiceExt};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::accounts::users;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::routes::build_app;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "offersplus")]
#[command(about = "OffersPlus job-application tracker API and maintenance commands")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Seed the companies table with well-known tech companies and banks
    PopulateCompanies,
    /// Replace all job postings with the current internship feed
    PopulateJobs,
    /// Sync Gmail application emails for a user
    SyncApplications {
        /// Username whose linked Gmail account is synced
        username: String,
    },
    /// Bulk-import parsed H1B LCA disclosure records
    ImportH1b {
        /// JSON file holding an array of records
        file: PathBuf,
        /// Records per insert batch
        #[arg(long, default_value_t = h1b::import::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = build_state(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::PopulateCompanies => {
            let created = companies::seed::populate_companies(&state.db).await?;
            info!("Successfully populated companies ({created} processed)");
            Ok(())
        }
        Command::PopulateJobs => {
            let created = internships::feed::populate_job_postings(
                &state.db,
                &state.http,
                &state.config.internship_feed_url,
            )
            .await?;
            info!("Successfully created {created} job postings");
            Ok(())
        }
        Command::SyncApplications { username } => sync_applications(&state, &username).await,
        Command::ImportH1b { file, batch_size } => {
            let summary = h1b::import::import_file(&state.db, &file, batch_size).await?;
            if summary.uploaded == 0 {
                anyhow::bail!("No H1B records were uploaded from {}", file.display());
            }
            Ok(())
        }
    }
}

async fn build_state(config: Config) -> Result<AppState> {
    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO / Supabase storage
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(AppState {
        db,
        redis,
        s3,
        llm,
        http,
        config,
    })
}

async fn serve(state: AppState) -> Result<()> {
    info!("Starting OffersPlus API v{}", env!("CARGO_PKG_VERSION"));
    let port = state.config.port;

    let app = build_app(state);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}

async fn sync_applications(state: &AppState, username: &str) -> Result<()> {
    let user = users::find_by_username(&state.db, username)
        .await?
        .with_context(|| format!("User {username} does not exist"))?;
    if user.email.trim().is_empty() {
        anyhow::bail!("User {username} has no email address to sync");
    }

    match gmail::sync::sync_user_mailbox(state, user.id, &user.email).await {
        Ok(synced) if !synced.is_empty() => {
            info!("Successfully synced {} applications for {username}", synced.len());
            Ok(())
        }
        Ok(_) => {
            warn!("No applications found to sync for {username}");
            Ok(())
        }
        Err(e) => anyhow::bail!("Failed to sync applications for {username}: {e}"),
    }
}

/// Constructs an S3 client for MinIO or Supabase storage (path-style) or AWS.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "offersplus-static",
    );

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
