// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::RelayRuntime;
use crate::modules::interceptor::action::AppAction;
use crate::modules::interceptor::state::StateSnapshot;
use crate::modules::interceptor::{DispatchOutcome, FlushOutcome};
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use poem_openapi::{payload::Json, OpenApi};

pub struct ActionApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Action")]
impl ActionApi {
    /// Dispatches an application action.
    ///
    /// Local state is updated first. The action is then queued for telemetry; if the
    /// queue fills up the batch is delivered, and stored as a task when delivery fails.
    #[oai(path = "/actions", method = "post", operation_id = "dispatch_action")]
    async fn dispatch_action(&self, action: Json<AppAction>) -> ApiResult<Json<DispatchOutcome>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.interceptor.dispatch(action.0).await))
    }

    /// Delivers the pending batch now, even if it is not full.
    ///
    /// Returns null when nothing was queued.
    #[oai(path = "/actions/flush", method = "post", operation_id = "flush_actions")]
    async fn flush_actions(&self) -> ApiResult<Json<Option<FlushOutcome>>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.interceptor.flush().await))
    }

    /// Local view of likes, bookmarks and shares.
    #[oai(path = "/state", method = "get", operation_id = "get_state")]
    async fn get_state(&self) -> ApiResult<Json<StateSnapshot>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.interceptor.snapshot().await))
    }
}
