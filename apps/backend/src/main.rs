#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mastery_backend::run().await
}
