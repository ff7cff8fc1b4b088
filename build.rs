//! Build script for the calorie tracker
//!
//! Keeps a per-checkout build counter and hands build metadata to the crate as
//! `CT_*` environment variables. Failures here degrade to a warning; the
//! counter is informational and must never break a build.

use std::fs;
use std::io;
use std::path::Path;

const COUNTER_FILE: &str = "build_number.txt";

fn next_build_number(path: &Path) -> io::Result<u64> {
    let previous = match fs::read_to_string(path) {
        Ok(contents) => contents.trim().parse::<u64>().unwrap_or(0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e),
    };
    let next = previous.saturating_add(1);
    fs::write(path, next.to_string())?;
    Ok(next)
}

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=Cargo.toml");

    let build_number = match next_build_number(Path::new(COUNTER_FILE)) {
        Ok(n) => n,
        Err(e) => {
            println!("cargo:warning=build counter unavailable ({}), embedding 0", e);
            0
        }
    };
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("CT_BUILD_NUMBER", build_number.to_string()),
        ("CT_BUILD_TIMESTAMP", built_at),
        ("CT_BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}
