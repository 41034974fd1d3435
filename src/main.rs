use events::EventPublisher;
use log::{error, info};
use realtime::{Manager, RealtimeDomainEventHandler};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!(
        "Starting presence server [{}] in {} mode",
        config.listen_address(),
        config.runtime_env()
    );

    let realtime = Arc::new(Manager::new());
    let event_publisher = EventPublisher::new()
        .with_handler(Arc::new(RealtimeDomainEventHandler::new(realtime.clone())));

    let service_state = service::AppState::new(config);
    let app_state = web::AppState::new(service_state, &realtime, event_publisher);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
