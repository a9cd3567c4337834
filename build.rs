// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=CAMERA_SESSION_VERSION");

    // Packagers may pin the version string explicitly
    let version = std::env::var("CAMERA_SESSION_VERSION").unwrap_or_else(|_| build_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Crate version suffixed with the short commit hash when building from git,
/// e.g. "0.1.18+3f9a2c1". Falls back to the bare crate version.
fn build_version() -> String {
    let crate_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());

    match short_commit_hash() {
        Some(hash) => format!("{}+{}", crate_version, hash),
        None => crate_version,
    }
}

fn short_commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|hash| !hash.is_empty())
}
