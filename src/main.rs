#[tokio::main]
async fn main() -> anyhow::Result<()> {
    threadline_server::run().await
}
