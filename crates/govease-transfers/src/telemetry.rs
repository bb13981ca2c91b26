//! Tracing setup for the transfer matching service.
//!
//! `RUST_LOG` wins when set; otherwise the configured level is applied to
//! the service crates on top of a `warn` floor, so `APP_LOG_LEVEL=debug`
//! surfaces matching and dispatch detail without dependency chatter.

use crate::config::TelemetryConfig;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log directive '{directive}'")]
    Directive {
        directive: String,
        source: ParseError,
    },
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

fn default_directives(level: &str) -> String {
    format!("warn,govease_transfers={level},govease_transfers_api={level}")
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = default_directives(&config.log_level);
            EnvFilter::try_new(&directive)
                .map_err(|source| TelemetryError::Directive { directive, source })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
