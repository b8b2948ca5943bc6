// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use action::ActionApi;
use poem_openapi::{OpenApiService, Tags};
use system::SystemApi;
use task::TaskApi;

use crate::relay_version;

pub mod action;
pub mod system;
pub mod task;

#[derive(Tags)]
pub enum ApiTags {
    Action,
    Task,
    System,
}

type RelayOpenApi = (ActionApi, TaskApi, SystemApi);

pub fn create_openapi_service() -> OpenApiService<RelayOpenApi, ()> {
    OpenApiService::new(
        (ActionApi, TaskApi, SystemApi),
        "ActionRelayApi",
        relay_version!(),
    )
}
