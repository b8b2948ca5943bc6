// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod batch;
pub mod common;
pub mod context;
pub mod database;
pub mod delivery;
pub mod error;
pub mod interceptor;
pub mod logger;
pub mod metrics;
pub mod rest;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod utils;
