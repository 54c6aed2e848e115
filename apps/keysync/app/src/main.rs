//! Enclave-side key-sync app entrypoint.

fn main() {
    keysync_app::cli::Cli::execute();
}
