use anyhow::Context;

use card_echo_bot::adapter::BotAdapter;
use card_echo_bot::config::BotConfig;
use card_echo_bot::server::{MESSAGES_PATH, message_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("invalid startup configuration")?;
    let adapter = BotAdapter::from_config(&config).context("failed to initialize bot")?;
    let app = message_routes(adapter);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr()?;

    eprintln!("🤖 Card Echo Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Messages: http://{}{}", local, MESSAGES_PATH);
    eprintln!("   Health:   http://{}/health\n", local);
    tracing::info!(
        port = local.port(),
        timeout_secs = config.http_timeout.as_secs(),
        trusted_hosts = ?config.trusted_service_hosts,
        "Bot is listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
