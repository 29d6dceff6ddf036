use std::env;

fn main() {
    // Only real-hardware builds link the LabJack LJM shared library.
    // Simulated runs and tests need nothing beyond the standard toolchain.
    if env::var("CARGO_FEATURE_HARDWARE").is_err() {
        return;
    }

    // Allow a non-standard LJM install location via environment
    if let Ok(dir) = env::var("LJM_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
    println!("cargo:rustc-link-lib=dylib=LabJackM");
    println!("cargo:rerun-if-env-changed=LJM_LIB_DIR");
}
