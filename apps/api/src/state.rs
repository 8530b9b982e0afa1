use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Cache for the public internship feed.
    pub redis: RedisClient,
    /// Resume storage (Supabase storage, MinIO or AWS).
    pub s3: S3Client,
    pub llm: LlmClient,
    /// Outbound client for the internship feed, company websites and Gmail.
    pub http: reqwest::Client,
    pub config: Config,
}

#[cfg(test)]
impl AppState {
    /// State for router tests. The pool is lazy and nothing dials out until a
    /// handler actually uses a backend.
    pub fn for_tests() -> Self {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        let config = Config::for_tests();
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let redis = RedisClient::open(config.redis_url.as_str()).expect("redis url");
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "offersplus-test"))
            .endpoint_url(&config.s3_endpoint)
            .force_path_style(true)
            .build();
        let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())
            .expect("llm client");

        AppState {
            db,
            redis,
            s3: S3Client::from_conf(s3_config),
            llm,
            http: reqwest::Client::new(),
            config,
        }
    }
}
