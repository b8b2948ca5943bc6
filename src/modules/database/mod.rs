// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::error::{RelayError, RelayResult};
use crate::raise_error;
use db_type::{KeyOptions, ToKeyDefinition};
use itertools::Itertools;
use native_db::*;
use std::sync::Arc;
use transaction::RwTransaction;

#[inline]
pub(crate) fn storage_error<E: std::fmt::Debug>(e: E) -> RelayError {
    raise_error!(format!("{:#?}", e), ErrorCode::StorageUnavailable)
}

/// Runs `write` inside one read-write transaction and commits it.
pub async fn write_impl<R: Send + 'static>(
    database: &Arc<Database<'static>>,
    write: impl FnOnce(&RwTransaction) -> RelayResult<R> + Send + 'static,
) -> RelayResult<R> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let rw_transaction = db.rw_transaction().map_err(storage_error)?;
        let result = write(&rw_transaction)?;
        rw_transaction.commit().map_err(storage_error)?;
        Ok(result)
    })
    .await
    .map_err(storage_error)?
}

pub async fn async_find_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key: impl ToKey + Send + 'static,
) -> RelayResult<Option<T>> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(storage_error)?;
        let entity: Option<T> = r_transaction
            .get()
            .primary(key)
            .map_err(storage_error)?;
        Ok(entity)
    })
    .await
    .map_err(storage_error)?
}

pub async fn batch_delete_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    delete: impl FnOnce(&RwTransaction) -> RelayResult<Vec<T>> + Send + 'static,
) -> RelayResult<usize> {
    write_impl(database, move |rw_transaction| {
        let to_delete = delete(rw_transaction)?;
        let delete_count = to_delete.len();
        for item in to_delete {
            rw_transaction.remove(item).map_err(storage_error)?;
        }
        Ok(delete_count)
    })
    .await
}

pub async fn list_all_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
) -> RelayResult<Vec<T>> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(storage_error)?;
        let entities: Vec<T> = r_transaction
            .scan()
            .primary()
            .map_err(storage_error)?
            .all()
            .map_err(storage_error)?
            .try_collect()
            .map_err(storage_error)?;
        Ok(entities)
    })
    .await
    .map_err(storage_error)?
}

pub async fn filter_by_secondary_key_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    start_with: impl ToKey + Send + 'static,
) -> RelayResult<Vec<T>> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(storage_error)?;
        let entities: Vec<T> = r_transaction
            .scan()
            .secondary(key_def)
            .map_err(storage_error)?
            .start_with(start_with)
            .map_err(storage_error)?
            .try_collect()
            .map_err(storage_error)?;
        Ok(entities)
    })
    .await
    .map_err(storage_error)?
}

pub async fn count_by_secondary_key_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    start_with: impl ToKey + Send + 'static,
) -> RelayResult<usize> {
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r_transaction = db.r_transaction().map_err(storage_error)?;
        let count = r_transaction
            .scan()
            .secondary::<T>(key_def)
            .map_err(storage_error)?
            .start_with(start_with)
            .map_err(storage_error)?
            .count();
        Ok(count)
    })
    .await
    .map_err(storage_error)?
}
