//! Tracing initialization

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::{Error, Result}};

/// Install a JSON `tracing` subscriber filtered by `service.log_level`
///
/// An unparsable filter falls back to `info`. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

/// Shutdown tracing (no-op; the fmt subscriber writes synchronously)
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown (no-op)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_reports_error() {
        let config = Config::default();
        // The first call may fail if another test installed a subscriber
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(Error::Tracing(_))));
        shutdown_tracing();
    }
}
