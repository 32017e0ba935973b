use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let version = env::var("CARGO_PKG_VERSION").unwrap();
    println!("cargo:rustc-env=FULL_VERSION={}", full_version(&version));
}

#[cfg(feature = "bin")]
fn full_version(version: &str) -> String {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    format!("{version} ({date})")
}

#[cfg(not(feature = "bin"))]
fn full_version(version: &str) -> String {
    version.to_string()
}
