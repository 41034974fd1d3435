use crate::{controller::health_check_controller, ws, AppState};
use axum::{routing::get, Router};

use crate::controller::presence_controller;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Presence Platform API"
        ),
        paths(
            health_check_controller::health_check,
            presence_controller::index,
            presence_controller::read,
        ),
        components(
            schemas(
                presence_controller::OnlineStatus,
            )
        ),
        tags(
            (name = "presence_platform", description = "Presence & real-time notification API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(presence_routes(app_state.clone()))
        .merge(socket_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn presence_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/online_users", get(presence_controller::index))
        .route("/online_users/:user_id", get(presence_controller::read))
        .with_state(app_state)
}

fn socket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/socket", get(ws::handler::ws_handler))
        .with_state(app_state)
}
