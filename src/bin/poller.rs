use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trafiknotis::config::AppConfig;
use trafiknotis::db;
use trafiknotis::dispatch::DispatchService;
use trafiknotis::notifications::senders::NotificationSender;
use trafiknotis::notifications::senders::{email::EmailSender, sms::SmsSender};
use trafiknotis::traffic::TrafikverketClient;

/// Standalone deviation poller: runs the same poll cycle as the server's
/// background loop, without the HTTP API.
#[derive(Parser, Debug)]
#[command(name = "poller", version, about)]
struct Cli {
    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    /// Override the poll interval in seconds.
    #[arg(long)]
    interval: Option<u64>,
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "critical error loading configuration, exiting");
            return Err(e.into());
        }
    };

    let pool = db::init_pool(&config.database_url).await?;
    info!("connected to database");

    let source = Arc::new(TrafikverketClient::new(&config)?);
    let sms_sender = Arc::new(SmsSender::new(&config)?);
    let email_sender = Arc::new(EmailSender::new(&config)?);

    let dispatch_service = Arc::new(DispatchService::new(
        pool,
        source,
        sms_sender as Arc<dyn NotificationSender>,
        email_sender as Arc<dyn NotificationSender>,
        config.poll_channels.clone(),
    ));

    if cli.once {
        dispatch_service.run_poll_cycle().await?;
        return Ok(());
    }

    let period = cli
        .interval
        .map(Duration::from_secs)
        .unwrap_or(config.poll_interval);
    dispatch_service.start_periodic_dispatch(period).await;
    Ok(())
}
