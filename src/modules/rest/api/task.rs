// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::RelayRuntime;
use crate::modules::error::code::ErrorCode;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::modules::store::model::Task;
use crate::raise_error;
use poem_openapi::{param::Path, payload::Json, OpenApi};

pub struct TaskApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Task")]
impl TaskApi {
    /// Lists every stored task, completed or not.
    #[oai(path = "/tasks", method = "get", operation_id = "list_tasks")]
    async fn list_tasks(&self) -> ApiResult<Json<Vec<Task>>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.store.get_all().await?))
    }

    /// Retrieves a task by id.
    #[oai(path = "/tasks/:id", method = "get", operation_id = "get_task")]
    async fn get_task(
        &self,
        /// The id assigned when the task was stored.
        id: Path<u64>,
    ) -> ApiResult<Json<Task>> {
        let runtime = RelayRuntime::get()?;
        let task = runtime.store.get_by_id(id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Task '{}' not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(task))
    }

    /// Deletes a task by id. Deleting a missing task is not an error.
    ///
    /// This is the only way to remove a dead-lettered task.
    #[oai(path = "/tasks/:id", method = "delete", operation_id = "remove_task")]
    async fn remove_task(&self, id: Path<u64>) -> ApiResult<()> {
        let runtime = RelayRuntime::get()?;
        Ok(runtime.store.delete_by_id(id.0).await?)
    }

    /// Lists tasks that have not been delivered yet, including dead-lettered ones.
    #[oai(
        path = "/tasks-incomplete",
        method = "get",
        operation_id = "list_incomplete_tasks"
    )]
    async fn list_incomplete_tasks(&self) -> ApiResult<Json<Vec<Task>>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.store.get_incomplete().await?))
    }

    #[oai(
        path = "/tasks-incomplete/count",
        method = "get",
        operation_id = "count_incomplete_tasks"
    )]
    async fn count_incomplete_tasks(&self) -> ApiResult<Json<u64>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.store.get_incomplete_count().await? as u64))
    }

    /// Lists tasks whose action name matches exactly, e.g. `TELEMETRY` or `LIKE_SYNC`.
    #[oai(
        path = "/tasks-by-action/:name",
        method = "get",
        operation_id = "list_tasks_by_action"
    )]
    async fn list_tasks_by_action(&self, name: Path<String>) -> ApiResult<Json<Vec<Task>>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.store.get_by_action(&name.0).await?))
    }

    /// Deletes all completed tasks and returns how many were removed.
    #[oai(
        path = "/tasks-purge-completed",
        method = "post",
        operation_id = "purge_completed_tasks"
    )]
    async fn purge_completed_tasks(&self) -> ApiResult<Json<u64>> {
        let runtime = RelayRuntime::get()?;
        Ok(Json(runtime.store.purge_completed().await? as u64))
    }

    /// Lists tasks that used up their retries and will not be executed again.
    #[oai(
        path = "/tasks-dead-letter",
        method = "get",
        operation_id = "list_dead_letter_tasks"
    )]
    async fn list_dead_letter_tasks(&self) -> ApiResult<Json<Vec<Task>>> {
        let runtime = RelayRuntime::get()?;
        let max_retries = runtime.scheduler.max_retries();
        Ok(Json(runtime.store.get_dead_letters(max_retries).await?))
    }
}
