use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trafiknotis::config::AppConfig;
use trafiknotis::db;
use trafiknotis::dispatch::DispatchService;
use trafiknotis::notifications::senders::NotificationSender;
use trafiknotis::notifications::senders::{email::EmailSender, sms::SmsSender};
use trafiknotis::traffic::TrafikverketClient;
use trafiknotis::web::{self, AppState};

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
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
        pool.clone(),
        source,
        sms_sender.clone() as Arc<dyn NotificationSender>,
        email_sender as Arc<dyn NotificationSender>,
        config.poll_channels.clone(),
    ));

    tokio::spawn(
        dispatch_service
            .clone()
            .start_periodic_dispatch(config.poll_interval),
    );

    let app_state = Arc::new(AppState {
        db_pool: pool,
        dispatch_service,
        sms_sender,
    });

    web::run_http_server(app_state, config.http_addr).await
}
