use hookbridge_core::{ConfigStore, PayloadLogger};
use hookbridge_service::{
    retry::RetryPolicy, start_server, AppConfig, AppState, HttpSinkClient, ServiceError,
    SinkClient,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so its log level can seed the filter.
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(3);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "hookbridge_service={level},hookbridge_core={level},tower_http=warn",
                    level = config.logging.level.to_lowercase()
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HookBridge");

    let store = Arc::new(ConfigStore::new(
        config.store.config_file.clone(),
        config.store.backup_directory.clone(),
    ));

    let payload_log = if config.webhook_logging.enabled {
        Arc::new(PayloadLogger::new(
            config.webhook_logging.base_directory.clone(),
            config.webhook_logging.max_bytes,
            config.webhook_logging.backup_count,
            config.webhook_logging.log_file_name.clone(),
        ))
    } else {
        Arc::new(PayloadLogger::disabled())
    };

    let retry = RetryPolicy::with_max_attempts(config.sink.retry_attempts);
    let sink: Arc<dyn SinkClient> = match HttpSinkClient::new(&config.sink, retry) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            error!("Failed to construct sink client: {}", e);
            std::process::exit(3);
        }
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting HTTP server"
    );

    let state = AppState::new(config, store, payload_log, sink);

    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::Sink(_) => 4,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
