//! Build Script for Frame Relay
//!
//! The protobuf stubs are checked in under `packages/schema-gen/rust/relay/v1/`
//! (generated from `packages/proto/relay/v1/frame_relay.proto` with
//! `buf generate`, see `packages/schema-gen/README.md`), so this script only
//! tracks them for rebuilds and emits the coverage cfg.

use std::env;

fn main() {
    // Rerun build script if it changes
    println!("cargo:rerun-if-changed=build.rs");

    // Rerun if the proto or the generated stubs change
    println!("cargo:rerun-if-changed=../../packages/proto/relay/");
    println!("cargo:rerun-if-changed=../../packages/schema-gen/rust/relay/v1/");

    // Emit cfg for coverage detection
    if env::var("CARGO_LLVM_COV").is_ok()
        || env::var("LLVM_PROFILE_FILE").is_ok()
        || env::var("RUSTFLAGS")
            .map(|f| f.contains("instrument-coverage"))
            .unwrap_or(false)
    {
        println!("cargo:rustc-cfg=coverage");
    }
}
