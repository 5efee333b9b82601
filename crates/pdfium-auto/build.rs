// Embeds libpdfium for the `bundled` feature.
//
// The library named by PDFIUM_BUNDLE_LIB is copied into OUT_DIR under a fixed
// name, and `bundled.rs` is generated next to it so lib.rs can `include!` a
// literal `include_bytes!` path.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const BUNDLE_ENV: &str = "PDFIUM_BUNDLE_LIB";
const EMBEDDED_NAME: &str = "bundled_pdfium_lib";

fn main() {
    println!("cargo:rerun-if-env-changed={BUNDLE_ENV}");

    if env::var_os("CARGO_FEATURE_BUNDLED").is_none() {
        return;
    }

    let source = match env::var(BUNDLE_ENV) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => fail(&format!(
            "the `bundled` feature needs {BUNDLE_ENV}=/path/to/libpdfium \
             (.so, .dylib or .dll; prebuilt copies are published at \
             https://github.com/bblanchon/pdfium-binaries/releases)"
        )),
    };
    if !source.is_file() {
        fail(&format!("{BUNDLE_ENV} is not a file: {}", source.display()));
    }
    println!("cargo:rerun-if-changed={}", source.display());

    let out_dir = match env::var_os("OUT_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => fail("OUT_DIR is not set"),
    };
    embed(&source, &out_dir);
}

fn embed(source: &Path, out_dir: &Path) {
    let dest = out_dir.join(EMBEDDED_NAME);
    if let Err(e) = fs::copy(source, &dest) {
        fail(&format!("copy {} to {}: {e}", source.display(), dest.display()));
    }

    let code = format!(
        "/// libpdfium, embedded at compile time.\n\
         pub static PDFIUM_BYTES: &[u8] = include_bytes!(\"{EMBEDDED_NAME}\");\n"
    );
    let generated = out_dir.join("bundled.rs");
    if let Err(e) = fs::write(&generated, code) {
        fail(&format!("write {}: {e}", generated.display()));
    }
}

fn fail(message: &str) -> ! {
    panic!("pdfium-auto: {message}")
}
