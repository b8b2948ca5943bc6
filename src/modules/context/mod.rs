// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::modules::{
    delivery::{DeliveryEndpoints, HttpDeliveryClient},
    error::{code::ErrorCode, RelayResult},
    interceptor::{ActionInterceptor, LikeSyncConfig},
    scheduler::{handlers::TaskHandlers, periodic::TaskHandle, TaskScheduler},
    settings::{cli::SETTINGS, dir::DATA_DIR_MANAGER},
    store::TaskRepository,
};
use crate::{raise_error, utc_now};

pub trait Initialize {
    async fn initialize() -> RelayResult<()>;
}

pub trait RelayTask {
    fn start() -> TaskHandle;
}

static RELAY_RUNTIME: OnceLock<RelayRuntime> = OnceLock::new();

/// Long-lived components shared by the background tasks and the REST API.
pub struct RelayRuntime {
    start_at: i64,
    pub store: Arc<TaskRepository>,
    pub interceptor: Arc<ActionInterceptor>,
    pub scheduler: Arc<TaskScheduler>,
}

impl RelayRuntime {
    pub fn get() -> RelayResult<&'static RelayRuntime> {
        RELAY_RUNTIME.get().ok_or_else(|| {
            raise_error!(
                "Relay runtime is not initialized".into(),
                ErrorCode::InternalError
            )
        })
    }

    pub fn uptime_ms(&self) -> i64 {
        utc_now!() - self.start_at
    }

    fn build() -> RelayResult<Self> {
        let store = Arc::new(if SETTINGS.relay_storage_memory_mode {
            TaskRepository::volatile()
        } else {
            TaskRepository::on_disk(DATA_DIR_MANAGER.task_db.clone())
        });
        let delivery = Arc::new(HttpDeliveryClient::new(
            DeliveryEndpoints::from_settings(&SETTINGS),
            SETTINGS.delivery_timeout(),
        )?);
        let interceptor = Arc::new(ActionInterceptor::new(
            store.clone(),
            delivery.clone(),
            SETTINGS.relay_batch_max_size,
            LikeSyncConfig::from_settings(&SETTINGS),
        ));
        let scheduler = Arc::new(TaskScheduler::new(
            store.clone(),
            TaskHandlers::with_delivery(delivery),
            SETTINGS.relay_max_retries,
        ));
        Ok(Self {
            start_at: utc_now!(),
            store,
            interceptor,
            scheduler,
        })
    }
}

impl Initialize for RelayRuntime {
    async fn initialize() -> RelayResult<()> {
        let runtime = Self::build()?;
        let availability = runtime.store.open().await;
        info!("Task store opened, availability: {:?}", availability);
        RELAY_RUNTIME.set(runtime).map_err(|_| {
            raise_error!(
                "Relay runtime initialized twice".into(),
                ErrorCode::InternalError
            )
        })
    }
}
