#[tokio::main]
async fn main() {
    std::process::exit(wsmcp_cli::run().await);
}
