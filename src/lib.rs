pub mod api;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod secrets;
pub mod status;
pub mod validate;

#[cfg(test)]
mod test_support;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use api::StatusHandler;

pub struct AppState {
    pub function_name: String,
    pub handler: StatusHandler,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(function_name: String, handler: StatusHandler) -> Self {
        Self {
            function_name,
            handler,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
