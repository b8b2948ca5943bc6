// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::RelayRuntime;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::modules::scheduler::executor::ExecutionSummary;
use crate::modules::store::{Availability, BackendKind};
use poem_openapi::{payload::Json, Object, OpenApi};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Object)]
pub struct StorageStatus {
    pub availability: Availability,
    pub backend: BackendKind,
}

pub struct SystemApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::System")]
impl SystemApi {
    /// Runs a scheduler pass now.
    ///
    /// Returns null when a pass is already in progress.
    #[oai(path = "/scheduler/run", method = "post", operation_id = "run_scheduler")]
    async fn run_scheduler(&self) -> ApiResult<Json<Option<ExecutionSummary>>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.scheduler.run_tick().await?))
    }

    #[oai(path = "/storage", method = "get", operation_id = "get_storage_status")]
    async fn get_storage_status(&self) -> ApiResult<Json<StorageStatus>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(StorageStatus {
            availability: runtime.store.availability().await,
            backend: runtime.store.backend_kind().await,
        }))
    }

    /// Retries the task database after a fallback to memory.
    ///
    /// Tasks collected in memory meanwhile are moved into the database.
    #[oai(path = "/storage/reopen", method = "post", operation_id = "reopen_storage")]
    async fn reopen_storage(&self) -> ApiResult<Json<StorageStatus>> {
        let runtime = RelayRuntime::get()?;
        let availability = runtime.store.reopen().await;
        Ok(Json(StorageStatus {
            availability,
            backend: runtime.store.backend_kind().await,
        }))
    }
}
