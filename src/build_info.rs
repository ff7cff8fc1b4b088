//! Build metadata embedded by `build.rs`

use std::fmt;

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Identifies the running binary in `service_status` and the startup banner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: parse_build_number(option_env!("CT_BUILD_NUMBER")),
            build_timestamp: option_env!("CT_BUILD_TIMESTAMP").unwrap_or("unknown"),
            profile: option_env!("CT_BUILD_PROFILE").unwrap_or("unknown"),
        }
    }
}

/// Missing or malformed counters read as build 0
fn parse_build_number(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} (build {}, {}, {})",
            self.name, self.version, self.build_number, self.profile, self.build_timestamp
        )
    }
}

/// Print the startup banner to stderr; stdout carries the MCP transport
pub fn print_startup_banner() {
    let rule = "-".repeat(48);
    eprintln!("{}", rule);
    eprintln!("  Calorie Tracker MCP server");
    eprintln!("  {}", BuildInfo::current());
    eprintln!("{}", rule);
}
