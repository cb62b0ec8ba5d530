#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webnav_cli::cli::app::run().await
}
