//! Build script for orderscan CLI
//!
//! Writes `built.rs` and stamps the values shown by `orderscan --version`.

use std::env;

/// Forward a build variable to the compiler as `name`
fn stamp(name: &str, value: &str) {
    println!("cargo:rustc-env={name}={value}");
}

fn env_or_unknown(key: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    let commit = env_or_unknown("GIT_COMMIT_HASH");
    let short_commit: String = commit.chars().take(12).collect();

    stamp("BUILT_HOST", &env_or_unknown("HOST"));
    stamp("BUILT_TARGET", &env_or_unknown("TARGET"));
    stamp("BUILT_PROFILE", &env_or_unknown("PROFILE"));
    stamp("BUILT_GIT_COMMIT_HASH", &short_commit);
    stamp(
        "BUILT_TIME_UTC",
        &chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");
    println!("cargo:rerun-if-changed=build.rs");
}
