//! Embeds the full almanac image named by `LR11XX_ALMANAC_IMAGE`.
//!
//! The image is produced offline (for example by Semtech's
//! `get_full_almanac.py`) and is included verbatim. When the variable is unset
//! the bundled image is empty and `image::bundled()` reports it as too short.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_ENV: &str = "LR11XX_ALMANAC_IMAGE";

fn main() {
    println!("cargo:rerun-if-env-changed={IMAGE_ENV}");
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let dest = out_dir.join("bundled_almanac.rs");

    let source = match env::var(IMAGE_ENV) {
        Ok(path) if !path.is_empty() => {
            let path = Path::new(&path);
            let path = fs::canonicalize(path)
                .unwrap_or_else(|e| panic!("{IMAGE_ENV}={}: {e}", path.display()));
            println!("cargo:rerun-if-changed={}", path.display());
            format!(
                "/// Full almanac image embedded at build time.\n\
                 pub static BUNDLED_ALMANAC: &[u8] = include_bytes!({:?});\n",
                path.display().to_string()
            )
        }
        _ => "/// Full almanac image embedded at build time (none configured).\n\
              pub static BUNDLED_ALMANAC: &[u8] = &[];\n"
            .to_string(),
    };

    fs::write(&dest, source).expect("failed to write bundled_almanac.rs");
}
