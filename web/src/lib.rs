use axum::http::{HeaderValue, Method};
use events::EventPublisher;
use log::*;
use realtime::Manager;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
pub mod router;
mod ws;

// Web-level state: service infrastructure plus the realtime layer.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub service_state: service::AppState,
    pub realtime: Arc<Manager>,
    /// Handed to request handlers that emit domain events (message sent, post liked).
    /// Those producers (message and post endpoints) live in the surrounding
    /// backend, outside this server; nothing in this crate publishes yet.
    pub event_publisher: EventPublisher,
}

impl AppState {
    pub fn new(
        service_state: service::AppState,
        realtime: &Arc<Manager>,
        event_publisher: EventPublisher,
    ) -> Self {
        Self {
            service_state,
            realtime: Arc::clone(realtime),
            event_publisher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.service_state.config
    }
}

/// Builds the CORS layer from the configured origins. Origins that are not
/// valid header values are skipped.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_address = app_state.config().listen_address();
    info!("Server starting... listening for connections on http://{listen_address}");

    let cors = cors_layer(app_state.config());
    let app = router::define_routes(app_state).layer(cors);

    let listener = TcpListener::bind(&listen_address).await?;
    axum::serve(listener, app).await
}
