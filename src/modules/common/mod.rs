// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use super::error::RelayError;
use poem::error::ResponseError;
use poem::Body;
use poem::{http::StatusCode, Response};
use tracing::error;

pub mod error;
pub mod log;
pub mod signal;

impl ResponseError for RelayError {
    fn status(&self) -> StatusCode {
        self.code().status()
    }

    fn as_response(&self) -> Response
    where
        Self: std::error::Error + Send + Sync + 'static,
    {
        match self {
            RelayError::Generic {
                message,
                location,
                code,
            } => {
                error!(
                    error_code = *code as u32,
                    error_message = %message,
                    error_location = ?location
                );

                let body = Body::from_json(serde_json::json!({
                    "code": *code as u32,
                    "message": message.to_string(),
                }))
                .unwrap_or_else(|_| Body::from_string(message.to_string()));

                Response::builder().status(self.status()).body(body)
            }
        }
    }
}
