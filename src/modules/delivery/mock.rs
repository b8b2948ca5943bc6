// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

use poem::{handler, http::StatusCode, listener::TcpAcceptor, post, web::Json, Route, Server};
use serde_json::{json, Value};

use crate::{
    modules::{
        delivery::{Deliver, DeliveryEndpoints, DeliveryTarget, HttpDeliveryClient},
        error::{code::ErrorCode, RelayResult},
    },
    raise_error,
};

/// Records every delivery and fails on demand.
#[derive(Default)]
pub struct RecordingDelivery {
    calls: Mutex<Vec<(DeliveryTarget, Value)>>,
    failing: AtomicBool,
    failures_left: AtomicUsize,
}

impl RecordingDelivery {
    pub fn failing() -> Self {
        let delivery = Self::default();
        delivery.set_failing(true);
        delivery
    }

    /// Fails the first `times` deliveries, then succeeds.
    pub fn failing_times(times: usize) -> Self {
        let delivery = Self::default();
        delivery.failures_left.store(times, Ordering::SeqCst);
        delivery
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(DeliveryTarget, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Deliver for RecordingDelivery {
    async fn deliver(&self, target: DeliveryTarget, payload: Value) -> RelayResult<Value> {
        self.calls.lock().unwrap().push((target, payload));
        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.failing.load(Ordering::SeqCst) || scripted_failure {
            return Err(raise_error!(
                "simulated delivery failure".into(),
                ErrorCode::HttpResponseError
            ));
        }
        Ok(json!({ "status": "ok" }))
    }
}

#[handler]
fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "received": body }))
}

#[handler]
fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

#[handler]
async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "late": true }))
}

/// Starts a throwaway API on an ephemeral port and returns its base URL.
/// `/actions` echoes the body, `/like` answers 500 and `/unlike` takes 5s.
pub async fn spawn_api() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TcpAcceptor::from_tokio(listener).unwrap();
    let app = Route::new()
        .at("/v1/actions", post(echo))
        .at("/v1/like", post(broken))
        .at("/v1/unlike", post(slow));
    tokio::spawn(async move {
        let _ = Server::new_with_acceptor(acceptor).run(app).await;
    });
    format!("http://{}/v1", addr)
}

pub fn test_client(base: &str, timeout: Duration) -> HttpDeliveryClient {
    let endpoints = DeliveryEndpoints {
        telemetry: format!("{base}/actions"),
        like: format!("{base}/like"),
        unlike: format!("{base}/unlike"),
    };
    HttpDeliveryClient::new(endpoints, timeout).unwrap()
}
