// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::common::error::ErrorCapture;
use crate::modules::common::log::Tracing;
use crate::modules::common::signal::SIGNAL_MANAGER;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::handler::error_handler;
use crate::modules::error::RelayResult;
use crate::modules::metrics::endpoint::PrometheusEndpoint;
use crate::modules::rest::public::status::get_status;
use crate::modules::settings::cli::SETTINGS;

use super::error::ApiErrorResponse;
use crate::raise_error;
use api::create_openapi_service;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::{CatchPanic, Compression};
use poem::{middleware::Cors, EndpointExt, Route, Server};
use std::time::Duration;
use tracing::info;

pub mod api;
pub mod public;

pub type ApiResult<T, E = ApiErrorResponse> = std::result::Result<T, E>;

const DESCRIPTION: &str = r#"
    actionrelay queues application actions (likes, bookmarks, shares), applies them to a local state,
    and delivers them in batches to a remote telemetry endpoint.

    - Batches that cannot be delivered are kept in a local task store and retried on a schedule.
    - The task store falls back to memory when its database is unavailable.
    - Operators can inspect, purge and delete tasks, trigger the scheduler and reopen storage.
"#;

pub async fn start_http_server() -> RelayResult<()> {
    let listener = TcpListener::bind((SETTINGS.relay_bind_ip.clone(), SETTINGS.relay_http_port));

    let api_service = create_openapi_service()
        .description(DESCRIPTION)
        .summary("Offline action queue with batched telemetry delivery");

    let swagger = api_service.swagger_ui();
    let redoc = api_service.redoc();
    let spec_json = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();

    let open_api_route = Route::new()
        .nest_no_strip("/api/v1", api_service)
        .with(ErrorCapture)
        .with(Tracing);

    let cors = Cors::new()
        .allow_methods(vec!["GET", "POST", "DELETE", "OPTIONS", "HEAD"])
        .allow_headers(vec!["Content-Type"]);

    let route = Route::new()
        .nest("/api-docs/swagger", swagger)
        .nest("/api-docs/redoc", redoc)
        .nest("/api-docs/spec.json", spec_json)
        .nest("/api-docs/spec.yaml", spec_yaml)
        .nest("/metrics", PrometheusEndpoint)
        .nest("/api/status", get(get_status))
        .nest_no_strip("/api/v1", open_api_route)
        .with(cors)
        .with(Compression::new())
        .with(CatchPanic::new());

    let mut shutdown = SIGNAL_MANAGER.subscribe();
    let server = Server::new(listener)
        .name("actionrelay API Service")
        .idle_timeout(Duration::from_secs(60))
        .run_with_graceful_shutdown(
            route.catch_all_error(error_handler),
            async move {
                let _ = shutdown.recv().await;
            },
            Some(Duration::from_secs(5)),
        );
    info!(
        "actionrelay API Service is now running on {}:{}",
        SETTINGS.relay_bind_ip, SETTINGS.relay_http_port
    );
    server
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
}
