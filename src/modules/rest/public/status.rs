// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::RelayRuntime;
use crate::modules::error::RelayResult;
use crate::modules::store::{Availability, BackendKind};
use crate::relay_version;
use chrono::Local;
use poem::{handler, web::Json};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Object)]
pub struct RelayStatus {
    /// The service uptime in milliseconds since it started.
    pub uptime_ms: i64,
    /// The timezone in which the service is operating (e.g., "+08:00").
    pub timezone: String,
    pub version: String,
    pub storage_backend: BackendKind,
    pub storage_availability: Availability,
    /// Actions queued but not yet flushed.
    pub pending_batch: usize,
}

impl RelayStatus {
    pub async fn get() -> RelayResult<Self> {
        let runtime = RelayRuntime::get()?;
        Ok(Self {
            uptime_ms: runtime.uptime_ms(),
            timezone: Local::now().offset().to_string(),
            version: relay_version!().into(),
            storage_backend: runtime.store.backend_kind().await,
            storage_availability: runtime.store.availability().await,
            pending_batch: runtime.interceptor.pending_len().await,
        })
    }
}

#[handler]
pub async fn get_status() -> poem::Result<Json<RelayStatus>> {
    Ok(Json(RelayStatus::get().await?))
}
