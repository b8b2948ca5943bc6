// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;
use std::time::{Duration, Instant};

use poem_openapi::Enum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::modules::{
    batch::Batch,
    error::{code::ErrorCode, RelayResult},
    metrics::{FAILURE, RELAY_DELIVERY_DURATION_SECONDS, RELAY_DELIVERY_TOTAL, SUCCESS},
    settings::cli::Settings,
};
use crate::{raise_error, relay_version};

#[cfg(test)]
pub mod mock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Enum)]
pub enum DeliveryTarget {
    Telemetry,
    Like,
    Unlike,
}

impl DeliveryTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryTarget::Telemetry => "telemetry",
            DeliveryTarget::Like => "like",
            DeliveryTarget::Unlike => "unlike",
        }
    }
}

/// Pushes a payload to a remote endpoint. Implementations make exactly one
/// attempt; retrying is up to the caller.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(
        &self,
        target: DeliveryTarget,
        payload: Value,
    ) -> impl Future<Output = RelayResult<Value>> + Send;
}

/// Sends the batch queue as a JSON array of `{pk, sk, actionType}` to the
/// telemetry endpoint.
pub async fn deliver_batch<D: Deliver>(client: &D, batch: &Batch) -> RelayResult<Value> {
    let payload = serde_json::to_value(&batch.queue)
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
    client.deliver(DeliveryTarget::Telemetry, payload).await
}

#[derive(Clone, Debug)]
pub struct DeliveryEndpoints {
    pub telemetry: String,
    pub like: String,
    pub unlike: String,
}

impl DeliveryEndpoints {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            telemetry: settings.telemetry_url(),
            like: settings.like_url(),
            unlike: settings.unlike_url(),
        }
    }

    fn url(&self, target: DeliveryTarget) -> &str {
        match target {
            DeliveryTarget::Telemetry => &self.telemetry,
            DeliveryTarget::Like => &self.like,
            DeliveryTarget::Unlike => &self.unlike,
        }
    }
}

pub struct HttpDeliveryClient {
    client: reqwest::Client,
    endpoints: DeliveryEndpoints,
}

impl HttpDeliveryClient {
    pub fn new(endpoints: DeliveryEndpoints, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(format!("actionrelay/{}", relay_version!()))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to build HTTP client: {:#?}", e),
                    ErrorCode::InternalError
                )
            })?;
        Ok(Self { client, endpoints })
    }

    async fn post(&self, url: &str, payload: &Value) -> RelayResult<Value> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    raise_error!(
                        format!("Request to {} timed out", url),
                        ErrorCode::ConnectionTimeout
                    )
                } else {
                    raise_error!(format!("{:#?}", e), ErrorCode::NetworkError)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("{} responded with {}: {}", url, status, body),
                ErrorCode::HttpResponseError
            ));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                raise_error!(
                    format!("Reading the response of {} timed out", url),
                    ErrorCode::ConnectionTimeout
                )
            } else {
                raise_error!(format!("{:#?}", e), ErrorCode::NetworkError)
            }
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| {
            debug!("{} returned a non-JSON body, keeping it as text", url);
            Value::String(body)
        }))
    }
}

impl Deliver for HttpDeliveryClient {
    async fn deliver(&self, target: DeliveryTarget, payload: Value) -> RelayResult<Value> {
        let url = self.endpoints.url(target);
        let start = Instant::now();
        let result = self.post(url, &payload).await;
        let status = if result.is_ok() { SUCCESS } else { FAILURE };
        RELAY_DELIVERY_TOTAL
            .with_label_values(&[target.as_str(), status])
            .inc();
        RELAY_DELIVERY_DURATION_SECONDS
            .with_label_values(&[target.as_str(), status])
            .observe(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            warn!("Delivery to {} endpoint failed: {}", target.as_str(), e);
        }
        result
    }
}
