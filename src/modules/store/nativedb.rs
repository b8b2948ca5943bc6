// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use native_db::{transaction::RwTransaction, Builder, Database};
use tracing::info;

use crate::{
    modules::{
        database::{
            async_find_impl, batch_delete_impl, count_by_secondary_key_impl,
            filter_by_secondary_key_impl, list_all_impl, storage_error, write_impl,
        },
        error::{code::ErrorCode, RelayError, RelayResult},
        store::{
            entity::{TaskEntity, TaskEntityKey, STATE_COMPLETED, STATE_INCOMPLETE, TASK_MODELS},
            medium::TaskMedium,
            model::Task,
        },
    },
    raise_error,
};

/// Task medium backed by a native_db database.
#[derive(Clone)]
pub struct NativeDbTaskMedium {
    store: Arc<Database<'static>>,
}

impl NativeDbTaskMedium {
    pub fn open(path: &Path) -> RelayResult<Self> {
        info!("Opening task database at: {:?}", path);
        let database = Builder::new()
            .create(&TASK_MODELS, path)
            .map_err(handle_database_error)?;
        Ok(Self {
            store: Arc::new(database),
        })
    }

    pub fn in_memory() -> RelayResult<Self> {
        let database = Builder::new()
            .create_in_memory(&TASK_MODELS)
            .map_err(handle_database_error)?;
        Ok(Self {
            store: Arc::new(database),
        })
    }
}

fn handle_database_error(error: native_db::db_type::Error) -> RelayError {
    match error {
        native_db::db_type::Error::RedbDatabaseError(database_error) => match database_error {
            redb::DatabaseError::DatabaseAlreadyOpen => {
                raise_error!(
                    "Task database is already open by another instance".into(),
                    ErrorCode::StorageUnavailable
                )
            }
            other => {
                raise_error!(
                    format!("Task database error: {:?}", other),
                    ErrorCode::StorageCorrupted
                )
            }
        },
        other => {
            raise_error!(
                format!("Failed to create task database: {:?}", other),
                ErrorCode::StorageUnavailable
            )
        }
    }
}

fn next_id(rw: &RwTransaction) -> RelayResult<u64> {
    let scan = rw.scan().primary::<TaskEntity>().map_err(storage_error)?;
    let last = scan
        .all()
        .map_err(storage_error)?
        .rev()
        .next()
        .transpose()
        .map_err(storage_error)?;
    Ok(last.map_or(1, |entity| entity.id + 1))
}

fn write_task(rw: &RwTransaction, mut task: Task) -> RelayResult<Task> {
    let id = match task.id {
        Some(id) => id,
        None => next_id(rw)?,
    };
    task.id = Some(id);
    rw.upsert(TaskEntity::from_task(&task, id)?)
        .map_err(storage_error)?;
    Ok(task)
}

impl TaskMedium for NativeDbTaskMedium {
    async fn insert(&self, task: Task) -> RelayResult<Task> {
        write_impl(&self.store, move |rw| write_task(rw, task)).await
    }

    async fn insert_many(&self, tasks: Vec<Task>) -> RelayResult<Vec<Task>> {
        write_impl(&self.store, move |rw| {
            tasks.into_iter().map(|task| write_task(rw, task)).collect()
        })
        .await
    }

    async fn get_all(&self) -> RelayResult<Vec<Task>> {
        let entities: Vec<TaskEntity> = list_all_impl(&self.store).await?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: u64) -> RelayResult<Option<Task>> {
        let entity: Option<TaskEntity> = async_find_impl(&self.store, id).await?;
        Ok(entity.map(Into::into))
    }

    async fn delete_by_id(&self, id: u64) -> RelayResult<()> {
        batch_delete_impl(&self.store, move |rw| {
            let entity: Option<TaskEntity> = rw.get().primary(id).map_err(storage_error)?;
            Ok(entity.into_iter().collect())
        })
        .await?;
        Ok(())
    }

    async fn incomplete_count(&self) -> RelayResult<usize> {
        count_by_secondary_key_impl::<TaskEntity>(
            &self.store,
            TaskEntityKey::state,
            STATE_INCOMPLETE,
        )
        .await
    }

    async fn get_incomplete(&self) -> RelayResult<Vec<Task>> {
        let entities: Vec<TaskEntity> =
            filter_by_secondary_key_impl(&self.store, TaskEntityKey::state, STATE_INCOMPLETE)
                .await?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn get_by_action(&self, action_name: String) -> RelayResult<Vec<Task>> {
        // the secondary scan matches by prefix, keep exact names only
        let entities: Vec<TaskEntity> = filter_by_secondary_key_impl(
            &self.store,
            TaskEntityKey::action_key,
            action_name.clone(),
        )
        .await?;
        Ok(entities
            .into_iter()
            .filter(|entity| entity.action_name.as_deref() == Some(action_name.as_str()))
            .map(Into::into)
            .collect())
    }

    async fn purge_completed(&self) -> RelayResult<usize> {
        batch_delete_impl(&self.store, |rw| {
            let completed: Vec<TaskEntity> = rw
                .scan()
                .secondary::<TaskEntity>(TaskEntityKey::state)
                .map_err(storage_error)?
                .start_with(STATE_COMPLETED)
                .map_err(storage_error)?
                .try_collect()
                .map_err(storage_error)?;
            Ok(completed)
        })
        .await
    }
}
