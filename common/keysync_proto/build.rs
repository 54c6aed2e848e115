//! Compiles the proto at build time, rather than checking generated bindings
//! into the tree: one fewer manual step to keep in sync across the `app`/
//! `host` pair that both depend on this crate.

use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR set by cargo"));

    tonic_prost_build::configure()
        .file_descriptor_set_path(out_dir.join("keysync_descriptor.bin"))
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/keysync.proto"], &["proto"])
        .expect("compiling proto/keysync.proto");
}
