use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    colorlink::cli::run_cli().await
}
