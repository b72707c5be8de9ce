//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for reelcast-server.
///
/// Every field except the upstream API keys has a sensible default, so the
/// server starts out-of-the-box; jobs will only run end-to-end once the keys
/// are provided.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Maximum concurrent ffmpeg compositions; excess jobs queue.
    pub transcode_capacity: usize,

    /// Object-store bucket holding the background clip and results.
    pub media_bucket: String,

    /// Key of the background loop inside the media bucket.
    pub background_key: String,

    /// Filesystem root of the local object store.
    pub store_root: String,

    /// Base URL prefixed onto published object paths.
    pub public_base_url: String,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,

    /// Comma-separated CORS origin allowlist; unset means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Download the ffmpeg sidecar binaries at startup if missing.
    pub download_ffmpeg: bool,

    /// OpenAI key for script generation.
    pub openai_api_key: String,

    /// Chat model used for script generation.
    pub openai_model: String,

    /// Deepgram key for speech synthesis and transcription.
    pub deepgram_api_key: String,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("REELCAST_BIND", "0.0.0.0:3000"),
            log_level: env_or("REELCAST_LOG", "info"),
            log_json: env_flag("REELCAST_LOG_JSON", false),
            transcode_capacity: parse_env("REELCAST_TRANSCODE_CAPACITY", 2),
            media_bucket: env_or("REELCAST_MEDIA_BUCKET", "reelcast-media"),
            background_key: env_or("REELCAST_BACKGROUND_KEY", "background_loop.mp4"),
            store_root: env_or("REELCAST_STORE_ROOT", "./media-store"),
            public_base_url: env_or("REELCAST_PUBLIC_BASE_URL", "http://localhost:3000/media"),
            enable_swagger: env_flag("REELCAST_ENABLE_SWAGGER", true),
            cors_allowed_origins: std::env::var("REELCAST_CORS_ORIGINS").ok(),
            download_ffmpeg: env_flag("REELCAST_DOWNLOAD_FFMPEG", true),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_model: env_or("REELCAST_OPENAI_MODEL", "gpt-4o-mini"),
            deepgram_api_key: env_or("DEEPGRAM_API_KEY", ""),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
