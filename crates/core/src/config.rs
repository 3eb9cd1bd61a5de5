//! Application settings
//!
//! Settings are read once from `TODO_*` environment variables at startup and
//! handed to the components that need them. Malformed values fall back to
//! their defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

const DEFAULT_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// SQLite database file
    pub path: PathBuf,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("todo.db"),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_version: String,
    pub debug: bool,
    pub allowed_origins: Vec<String>,
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            debug: true,
            allowed_origins: vec![DEFAULT_ORIGIN.to_string()],
            bind_addr: default_bind_addr(),
            log_dir: PathBuf::from("logs"),
            database: DatabaseSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let allowed_origins = match var("TODO_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.allowed_origins,
        };

        Self {
            app_version: var("TODO_APP_VERSION").unwrap_or(defaults.app_version),
            debug: parse_flag("TODO_DEBUG", var("TODO_DEBUG"), defaults.debug),
            allowed_origins,
            bind_addr: parse_or(
                "TODO_BIND_ADDR",
                var("TODO_BIND_ADDR"),
                defaults.bind_addr,
            ),
            log_dir: var("TODO_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            database: DatabaseSettings {
                path: var("TODO_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.database.path),
                max_connections: parse_or(
                    "TODO_DATABASE_MAX_CONNECTIONS",
                    var("TODO_DATABASE_MAX_CONNECTIONS"),
                    defaults.database.max_connections,
                )
                .max(1),
            },
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("Ignoring unrecognized value {:?} for {}", raw, name);
                default
            }
        },
        None => default,
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable value {:?} for {}", raw, name);
            default
        }),
        None => default,
    }
}
