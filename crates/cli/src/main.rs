//! tansa — LINE research-assistant gateway.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    anyhow::Result,
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    tansa_gateway::{ingest::LoggingSink, server, state::GatewayState, sweep},
    tansa_line::{LineClient, LineCredentials},
    tansa_research::HttpResearchEngine,
};

#[derive(Parser)]
#[command(name = "tansa", about = "tansa — LINE research-assistant gateway")]
struct Cli {
    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000, env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// LINE channel secret used to verify webhook signatures.
    #[arg(long, env = "LINE_CHANNEL_SECRET", hide_env_values = true)]
    channel_secret: Option<String>,

    /// LINE channel access token used for replies and pushes.
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Base URL of the researcher service.
    #[arg(
        long,
        env = "TANSA_RESEARCHER_URL",
        default_value = "http://127.0.0.1:2024"
    )]
    researcher_url: String,

    /// Session and task TTL, in seconds.
    #[arg(long, default_value_t = 24 * 60 * 60)]
    state_ttl_secs: u64,

    /// Interval between expiry sweeps, in seconds.
    #[arg(long, default_value_t = sweep::SWEEP_INTERVAL.as_secs())]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let credentials = LineCredentials::from_parts(
        cli.channel_secret.as_deref().unwrap_or_default(),
        cli.access_token.as_deref().unwrap_or_default(),
    );
    if credentials.is_none() {
        warn!(
            "LINE credentials missing; the webhook will answer 503 until both \
             LINE_CHANNEL_SECRET and LINE_CHANNEL_ACCESS_TOKEN are set"
        );
    }

    let messenger = Arc::new(LineClient::new(
        cli.access_token.clone().unwrap_or_default(),
    ));
    let engine = Arc::new(HttpResearchEngine::new(cli.researcher_url.clone()));
    let state = GatewayState::new(credentials, messenger, engine, Arc::new(LoggingSink));

    sweep::spawn_sweeper(
        Arc::clone(&state),
        Duration::from_secs(cli.state_ttl_secs),
        Duration::from_secs(cli.sweep_interval_secs),
    );

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    info!(%addr, researcher = %cli.researcher_url, "starting tansa gateway");
    server::serve(state, addr).await
}
