use std::env;
use std::path::PathBuf;

const DEFAULT_SPCM_DLL_DIR: &str = "C:/Program Files (x86)/BH/SPCM/DLL";

fn main() {
    println!("cargo:rerun-if-env-changed=SPCM_DLL_DIR");
    println!("cargo:rerun-if-changed=build.rs");

    // The vendor DLL only exists for Windows; elsewhere the crate builds without linking it.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let dll_dir = env::var("SPCM_DLL_DIR").unwrap_or_else(|_| DEFAULT_SPCM_DLL_DIR.to_string());
    let lib_dir = PathBuf::from(dll_dir).join("LIB").join("MSVC64");
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
}
