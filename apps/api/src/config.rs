use anyhow::{Context, Result};

pub const DEFAULT_INTERNSHIP_FEED_URL: &str =
    "https://raw.githubusercontent.com/SimplifyJobs/Summer2024-Internships/dev/.github/scripts/listings.json";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub jwt_secret: String,
    /// When set, Supabase-issued access tokens are accepted alongside our own.
    pub supabase_jwt_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub internship_feed_url: String,
    pub internship_cache_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            jwt_secret: require_env("JWT_SECRET")?,
            supabase_jwt_secret: optional_env("SUPABASE_JWT_SECRET"),
            google_client_id: optional_env("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_env("GOOGLE_CLIENT_SECRET"),
            internship_feed_url: std::env::var("INTERNSHIP_FEED_URL")
                .unwrap_or_else(|_| DEFAULT_INTERNSHIP_FEED_URL.to_string()),
            internship_cache_ttl_secs: std::env::var("INTERNSHIP_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse::<u64>()
                .context("INTERNSHIP_CACHE_TTL_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl Config {
    /// A config with placeholder values for unit tests that never touch the network.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/offersplus_test".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            s3_bucket: "offersplus-test".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            openai_api_key: "test".to_string(),
            openai_base_url: "http://localhost:1".to_string(),
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            supabase_jwt_secret: Some("supabase-test-secret".to_string()),
            google_client_id: None,
            google_client_secret: None,
            internship_feed_url: DEFAULT_INTERNSHIP_FEED_URL.to_string(),
            internship_cache_ttl_secs: 900,
            port: 8080,
            rust_log: "debug".to_string(),
        }
    }
}
