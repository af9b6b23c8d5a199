//! Build script for weighlab
//!
//! Stamps each compilation with a build number, a UTC timestamp and the
//! cargo profile so the status tool can report exactly which binary is running.

use std::fs;
use std::path::Path;

const BUILD_NUMBER_FILE: &str = "build_number.txt";

fn read_build_number(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn main() {
    println!("cargo:rerun-if-changed=src");

    let path = Path::new(BUILD_NUMBER_FILE);
    let build = read_build_number(path) + 1;
    if let Err(e) = fs::write(path, build.to_string()) {
        println!("cargo:warning=could not persist build number: {}", e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=WEIGHLAB_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=WEIGHLAB_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=WEIGHLAB_BUILD_PROFILE={}", profile);
}
