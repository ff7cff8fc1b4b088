//! Runtime configuration
//!
//! Everything is read from the environment; the binaries share these defaults.

use std::path::PathBuf;

pub const DATABASE_PATH_VAR: &str = "CALORIE_TRACKER_DATABASE_PATH";
pub const POOL_SIZE_VAR: &str = "CALORIE_TRACKER_POOL_SIZE";

const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: database_path_from_env(),
            pool_size: pool_size_from_env(),
        }
    }
}

/// Get the database path from environment or use `<project>/data/calorie_tracker.db`
fn database_path_from_env() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
                    path = grandparent.to_path_buf();
                }
            }

            path.push("data");
            path.push("calorie_tracker.db");
            path
        })
}

fn pool_size_from_env() -> u32 {
    match std::env::var(POOL_SIZE_VAR) {
        Ok(raw) => parse_pool_size(&raw).unwrap_or_else(|| {
            tracing::warn!(
                "Ignoring {}={:?}; using default pool size {}",
                POOL_SIZE_VAR,
                raw,
                DEFAULT_POOL_SIZE
            );
            DEFAULT_POOL_SIZE
        }),
        Err(_) => DEFAULT_POOL_SIZE,
    }
}

fn parse_pool_size(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pool_size() {
        assert_eq!(parse_pool_size("4"), Some(4));
        assert_eq!(parse_pool_size(" 16 "), Some(16));
        assert_eq!(parse_pool_size("0"), None);
        assert_eq!(parse_pool_size("many"), None);
    }
}
