use std::env;
use std::process::Command;

/// Trimmed stdout of a command, if it ran and exited cleanly
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn enabled_features() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_")
                .map(|name| name.to_lowercase().replace('_', "-"))
        })
        .collect();
    if features.is_empty() {
        return "none".to_string();
    }
    features.sort();
    features.join(",")
}

/// CI ref if set, then git, then the crate version
fn repository_version() -> String {
    env::var("SEABED_BUILD_REF")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| command_stdout("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| command_stdout("git", &["rev-parse", "--short", "HEAD"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    for path in ["build.rs", ".git/HEAD", ".git/refs/heads"] {
        println!("cargo:rerun-if-changed={}", path);
    }

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    emit("BUILD_PROFILE", &profile);
    emit("BUILD_FEATURES", &enabled_features());
    emit("REPO_VERSION", &repository_version());
    emit("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
    emit(
        "RUST_VERSION",
        &command_stdout("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string()),
    );
    for (var, key) in [("TARGET", "BUILD_TARGET"), ("HOST", "BUILD_HOST")] {
        if let Ok(value) = env::var(var) {
            emit(key, &value);
        }
    }
}
