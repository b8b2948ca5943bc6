// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::Initialize;
use crate::modules::settings::cli::SETTINGS;
use crate::{
    modules::error::{code::ErrorCode, RelayResult},
    raise_error,
};
use std::path::PathBuf;
use std::sync::LazyLock;

const LOG_DIR: &str = "logs";

pub static DATA_DIR_MANAGER: LazyLock<DataDirManager> = LazyLock::new(|| {
    DataDirManager::new(
        PathBuf::from(&SETTINGS.relay_root_dir),
        &SETTINGS.relay_db_name,
    )
});

#[derive(Debug)]
pub struct DataDirManager {
    pub root_dir: PathBuf,
    pub task_db: PathBuf,
    pub log_dir: PathBuf,
}

impl Initialize for DataDirManager {
    async fn initialize() -> RelayResult<()> {
        std::fs::create_dir_all(&DATA_DIR_MANAGER.root_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        if SETTINGS.relay_log_to_file {
            std::fs::create_dir_all(&DATA_DIR_MANAGER.log_dir)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        }
        Ok(())
    }
}

impl DataDirManager {
    pub fn new(root_dir: PathBuf, db_name: &str) -> Self {
        Self {
            task_db: root_dir.join(db_name),
            log_dir: root_dir.join(LOG_DIR),
            root_dir,
        }
    }
}
