//! Build script for the storefront crate.
//!
//! Fingerprints the static assets referenced by the base template so their
//! URLs change whenever their content does.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets included in the fingerprint, relative to the crate root.
const FINGERPRINTED_ASSETS: &[&str] = &["static/css/main.css", "static/js/app.js"];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    let mut hasher = Sha256::new();
    for asset in FINGERPRINTED_ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());

        match fs::read(&path) {
            Ok(content) => {
                hasher.update(asset.as_bytes());
                hasher.update(&content);
            }
            Err(e) => println!("cargo:warning=Could not read {asset}: {e}"),
        }
    }

    let digest = format!("{:x}", hasher.finalize());
    let version = digest.get(..10).unwrap_or(&digest);

    // Read by the `asset_version` template filter via env!("ASSET_VERSION")
    println!("cargo:rustc-env=ASSET_VERSION={version}");
}
