use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `REWARDS_ENGINE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

/// Remote rewards authority.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bearer token attached to every request when present.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// On-device cache of the last known rewards profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_cache_key")]
    pub key: String,
}

// ─── Rewards Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    /// One free gift is earned every this many purchases.
    #[serde(default = "default_free_gift_threshold")]
    pub free_gift_threshold: u32,
    #[serde(default = "default_points_per_dollar")]
    pub points_per_dollar: u32,
}

// Default functions
fn default_base_url() -> String {
    "https://localhost:443".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_cache_path() -> String {
    ".rewards".to_string()
}
fn default_cache_key() -> String {
    "rewards_cache".to_string()
}
fn default_free_gift_threshold() -> u32 {
    10
}
fn default_points_per_dollar() -> u32 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            auth_token: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            key: default_cache_key(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            free_gift_threshold: default_free_gift_threshold(),
            points_per_dollar: default_points_per_dollar(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            cache: CacheConfig::default(),
            rewards: RewardsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("REWARDS_ENGINE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let loaded: Self = config.try_deserialize()?;
        tracing::debug!(
            base_url = %loaded.remote.base_url,
            free_gift_threshold = loaded.rewards.free_gift_threshold,
            "Rewards config loaded"
        );
        Ok(loaded)
    }
}
