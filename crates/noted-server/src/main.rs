use noted_server::{NotedServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path).await?,
        None => ServerConfig::default(),
    };
    NotedServer::new(config).serve().await?;
    Ok(())
}
