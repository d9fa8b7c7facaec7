//! Configuration for Campus Board
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Minimum accepted length for the session signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Campus Board - categorized posts, subscriptions and search for a campus community
#[derive(Parser, Debug, Clone)]
#[command(name = "campus-board")]
#[command(about = "Role-gated community board service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallbacks, insecure default secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "campus_board")]
    pub mongodb_db: String,

    /// HS256 secret shared with the identity provider (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Search engine base URL
    #[arg(long, env = "SEARCH_URL", default_value = "http://localhost:9200")]
    pub search_url: String,

    /// Search index holding post projections
    #[arg(long, env = "SEARCH_INDEX", default_value = "posts")]
    pub search_index: String,

    /// Unsigned upload endpoint of the object store (uploads disabled when unset)
    #[arg(long, env = "IMAGE_UPLOAD_URL")]
    pub image_upload_url: Option<String>,

    /// Upload preset sent with every image upload
    #[arg(long, env = "IMAGE_UPLOAD_PRESET", default_value = "blog_preset")]
    pub image_upload_preset: String,

    /// Outbound HTTP timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "10485760")]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-secret-do-not-deploy".to_string()),
            (None, false) => None,
        }
    }

    /// Outbound request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.jwt_secret() {
            None => return Err("JWT_SECRET is required in production mode".to_string()),
            Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_JWT_SECRET_LEN
                ));
            }
            Some(_) => {}
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }
}
