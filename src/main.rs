//! CLI for publishing a single message through a PopSub broker.
//!
//! Settings come from `config/default.*`, `POPSUB_*` environment variables
//! (a `.env` file is honored) and finally the command-line overrides.

use clap::Parser;
use popsub_delivery::config::{Settings, load_config};
use popsub_delivery::transport::HttpTransport;
use popsub_delivery::{DeliveryMode, MessageIntent, Publisher};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "popsub-publish", about = "Publish a message with a chosen delivery guarantee")]
struct Args {
    /// Topic to publish on
    #[arg(long)]
    topic: String,

    /// Message body
    #[arg(long)]
    payload: String,

    /// Geofence radius in kilometres
    #[arg(long, default_value_t = 1)]
    radius: u32,

    /// Time-to-live in minutes
    #[arg(long, default_value_t = 60)]
    lifetime: u32,

    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    #[arg(long)]
    title: Option<String>,

    /// at-least-once, at-most-once or exactly-once
    #[arg(long)]
    mode: Option<DeliveryMode>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Timeout ceiling for at-most-once
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Stable identifier used as the idempotency key prefix
    #[arg(long)]
    client_id: Option<String>,

    /// Broker base URL, e.g. http://127.0.0.1:8080
    #[arg(long)]
    broker_url: Option<String>,

    /// Session token sent as the `access_token` cookie
    #[arg(long)]
    access_token: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            popsub_delivery::utils::logging::init("info");
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    popsub_delivery::utils::logging::init(&settings.logging.level);

    if let Err(e) = run(args, settings).await {
        error!("Publish failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, mut settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = args.broker_url {
        settings.broker.base_url = url;
    }
    if let Some(token) = args.access_token {
        settings.broker.access_token = Some(token);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            return Err("--timeout-ms must be greater than zero".into());
        }
        settings.delivery.request_timeout_ms = timeout_ms;
    }
    if let Some(retry_limit) = args.retry_limit {
        settings.delivery.retry_limit = retry_limit;
    }
    let mode = args.mode.unwrap_or(settings.delivery.mode);

    let client_id = args
        .client_id
        .filter(|id| !id.is_empty())
        .or_else(|| Some(settings.client.id.clone()).filter(|id| !id.is_empty()))
        .unwrap_or_else(|| format!("client-{}", uuid::Uuid::new_v4()));

    let transport = HttpTransport::from_settings(&settings.broker)?;
    let publisher = Publisher::new(transport, client_id, settings.delivery.delivery_config());

    let mut intent = MessageIntent::new(args.topic, args.payload)
        .with_radius(args.radius)
        .with_lifetime_minutes(args.lifetime)
        .with_location(args.lat, args.lon);
    if let Some(title) = args.title {
        intent = intent.with_title(title);
    }

    info!(
        "Publishing to '{}' via {} ({mode})",
        intent.topic, settings.broker.base_url
    );

    let delivered = publisher.publish(&intent, mode).await?;
    info!("Message Published! ({} attempt(s))", delivered.attempts);

    // The outcome is already decided; let the release finish before exiting.
    if let Some(release) = delivered.release {
        release.wait().await;
    }

    Ok(())
}
