//! Runtime configuration read from the environment

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::availability::BoundaryPolicy;
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

/// Service configuration
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `AUTHORIZATION` - Shared secret required in the `Authorization` header of `/api` calls (optional)
/// - `SEED_FILE` - JSON array of listings imported at startup (optional)
/// - `ALLOW_SAME_DAY_TURNOVER` - Let a stay start on another stay's checkout day (default: false)
/// - `SESSION_TTL_SECS` - Idle seconds before a browsing session is dropped (default: 1800)
/// - `MAX_SESSIONS` - Browsing sessions kept at once (default: 1000)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub auth_token: Option<String>,
    pub seed_file: Option<String>,
    pub boundary_policy: BoundaryPolicy,
    pub session_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            auth_token: None,
            seed_file: None,
            boundary_policy: BoundaryPolicy::Inclusive,
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_var("PORT", defaults.port);
        let session_ttl = Duration::from_secs(parse_var(
            "SESSION_TTL_SECS",
            defaults.session_ttl.as_secs(),
        ));
        let max_sessions = match parse_var("MAX_SESSIONS", defaults.max_sessions) {
            0 => {
                warn!("MAX_SESSIONS must be positive, using {}", defaults.max_sessions);
                defaults.max_sessions
            }
            n => n,
        };

        let boundary_policy = match env::var("ALLOW_SAME_DAY_TURNOVER") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => BoundaryPolicy::SameDayTurnover,
                "0" | "false" | "no" | "" => BoundaryPolicy::Inclusive,
                _ => {
                    warn!(value = %raw, "invalid ALLOW_SAME_DAY_TURNOVER, keeping inclusive bounds");
                    BoundaryPolicy::Inclusive
                }
            },
            Err(_) => defaults.boundary_policy,
        };

        Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            auth_token: env::var("AUTHORIZATION").ok().filter(|s| !s.is_empty()),
            seed_file: env::var("SEED_FILE").ok().filter(|s| !s.is_empty()),
            boundary_policy,
            session_ttl,
            max_sessions,
        }
    }
}

/// Parses `name`, falling back to `default` when it is unset or malformed.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid {}, using {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
