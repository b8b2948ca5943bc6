// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Instant;

use poem::{
    http::header, web::RealIp, Endpoint, FromRequest, IntoResponse, Middleware, Request, Response,
    Result,
};
use poem_openapi::OperationId;
use tracing::{debug, error, info, warn, Instrument};

use crate::modules::metrics::{
    RELAY_REQUEST_DURATION_BY_STATUS, RELAY_REQUEST_TOTAL_BY_METHOD_AND_OPERATION,
};

#[derive(Default)]
pub struct Tracing;

impl<E: Endpoint> Middleware<E> for Tracing {
    type Output = TracingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        TracingEndpoint { inner: ep }
    }
}

/// Endpoint for the `Tracing` middleware.
pub struct TracingEndpoint<E> {
    inner: E,
}

impl<E: Endpoint> Endpoint for TracingEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        let remote_addr = RealIp::from_request_without_body(&req)
            .await
            .ok()
            .and_then(|real_ip| real_ip.0)
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| req.remote_addr().to_string());
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(|q| q.to_string());
        let content_length = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok().map(|v| v.to_string()));

        let span = tracing::info_span!(
            "request",
            remote_addr = %remote_addr,
            method = %method,
            path = %path,
            query = ?query,
            content_length = ?content_length,
        );

        async move {
            let now = Instant::now();
            let res = self.inner.call(req).await;
            let duration = now.elapsed();

            match res {
                Ok(resp) => {
                    let resp = resp.into_response();
                    let status = resp.status().as_u16();
                    if let Some(operation_id) = resp.data::<OperationId>() {
                        RELAY_REQUEST_DURATION_BY_STATUS
                            .with_label_values(&[status.to_string().as_str()])
                            .observe(duration.as_secs_f64());
                        RELAY_REQUEST_TOTAL_BY_METHOD_AND_OPERATION
                            .with_label_values(&[
                                method.as_str(),
                                operation_id.0,
                                status.to_string().as_str(),
                            ])
                            .inc();
                    }
                    log_response(&path, status, duration);
                    Ok(resp)
                }
                Err(err) => {
                    let status = err.status().as_u16();
                    log_response(&path, status, duration);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[inline]
fn log_response(path: &str, status: u16, duration: std::time::Duration) {
    match status {
        500.. => {
            error!(
                status = %status,
                duration = ?duration,
                "request completed with server error"
            );
        }
        400..=499 => {
            warn!(
                status = %status,
                duration = ?duration,
                "request completed with client error"
            );
        }
        // prometheus scrapes
        _ if path == "/metrics" => {
            debug!(status = %status, duration = ?duration, "metrics scraped");
        }
        _ => {
            info!(
                status = %status,
                duration = ?duration,
                "request completed successfully"
            );
        }
    }
}
