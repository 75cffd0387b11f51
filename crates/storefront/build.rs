//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet and the page script so both can be served
//! with long-lived cache headers. Each asset is copied to
//! `static/<dir>/derived/<stem>.<hash>.<ext>` and its hash is exported as a
//! compile-time environment variable for the `asset_path` template filter.

use std::env;
use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// (directory under `static/`, file stem, extension, env var).
const ASSETS: &[(&str, &str, &str, &str)] = &[
    ("css", "main", "css", "CSS_HASH"),
    ("js", "app", "js", "APP_JS_HASH"),
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    for &(dir, stem, ext, var) in ASSETS {
        let source = static_dir.join(dir).join(format!("{stem}.{ext}"));
        println!("cargo:rerun-if-changed={}", source.display());

        match fingerprint(&source, &static_dir.join(dir).join("derived"), stem, ext) {
            Ok(hash) => println!("cargo:rustc-env={var}={hash}"),
            Err(e) => {
                // The filter falls back to the unhashed path on an empty hash
                println!("cargo:warning=Could not fingerprint {}: {e}", source.display());
                println!("cargo:rustc-env={var}=");
            }
        }
    }
}

/// Copy `source` into `derived_dir` under its content hash; returns the hash.
fn fingerprint(source: &Path, derived_dir: &Path, stem: &str, ext: &str) -> io::Result<String> {
    let content = fs::read(source)?;
    let digest = format!("{:x}", Sha256::digest(&content));
    let short_hash = digest[..8].to_string();

    fs::create_dir_all(derived_dir)?;
    let derived = derived_dir.join(format!("{stem}.{short_hash}.{ext}"));
    if !derived.exists() {
        fs::write(&derived, &content)?;
    }

    Ok(short_hash)
}
