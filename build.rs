use std::process::Command;

/// Trimmed stdout of a command, if it ran and succeeded.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Value from the environment (release builds set these), else from `fallback`.
fn build_value(name: &str, fallback: impl FnOnce() -> Option<String>) -> String {
    println!("cargo:rerun-if-env-changed={}", name);
    std::env::var(name)
        .ok()
        .or_else(fallback)
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let git_sha = build_value("GIT_SHA", || {
        command_output("git", &["rev-parse", "--short", "HEAD"])
    });
    let build_date = build_value("BUILD_DATE", || command_output("date", &["+%Y-%m-%d"]));

    println!("cargo:rustc-env=GIT_SHA={}", git_sha);
    println!("cargo:rustc-env=BUILD_DATE={}", build_date);
}
