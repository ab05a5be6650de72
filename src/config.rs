//! Configuration management.
//!
//! Loads configuration from environment variables using the `PARA_*`
//! scheme. Every value has a sensible default so the binary works from a
//! bare checkout: the entity corpus lives under `<workspace>/para`, daily
//! notes under `<workspace>/memory`, and the access-log cache under
//! `~/.openclaw/memory-cache`.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub decay: DecaySettings,
    pub lock: LockConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root workspace path (default: current directory).
    pub workspace: PathBuf,
    /// Entity corpus directory (default: `<workspace>/para`).
    pub para_dir: PathBuf,
    /// Daily-notes directory (default: `<workspace>/memory`).
    pub memory_dir: PathBuf,
    /// Cache directory for the access log.
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DecaySettings {
    /// Days within which a fact stays Hot.
    pub hot_days: i64,
    /// Days within which a fact stays Warm.
    pub warm_days: i64,
    /// Access count at which a fact resists decay entirely.
    pub high_freq_threshold: u32,
}

#[derive(Debug, Clone)]
pub struct LockConfig {
    /// How long to wait for an entity lock before reporting Busy.
    pub timeout_ms: u64,
    /// Delay between lock acquisition attempts.
    pub retry_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let workspace = PathBuf::from(env_or("PARA_WORKSPACE", "."));
        let para_dir = env::var("PARA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| workspace.join("para"));
        let memory_dir = env::var("PARA_MEMORY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| workspace.join("memory"));
        let cache_dir = env::var("PARA_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_cache_dir());

        Self {
            storage: StorageConfig {
                workspace,
                para_dir,
                memory_dir,
                cache_dir,
            },
            decay: DecaySettings {
                hot_days: env_or("PARA_HOT_DAYS", "7").parse().unwrap_or(7),
                warm_days: env_or("PARA_WARM_DAYS", "30").parse().unwrap_or(30),
                high_freq_threshold: env_or("PARA_HIGH_FREQ_THRESHOLD", "10")
                    .parse()
                    .unwrap_or(10),
            },
            lock: LockConfig {
                timeout_ms: env_or("PARA_LOCK_TIMEOUT_MS", "5000").parse().unwrap_or(5000),
                retry_ms: env_or("PARA_LOCK_RETRY_MS", "50").parse().unwrap_or(50),
            },
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openclaw")
        .join("memory-cache")
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
