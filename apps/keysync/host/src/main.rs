#[tokio::main]
async fn main() {
    keysync_host::cli::CLI::execute().await;
}
