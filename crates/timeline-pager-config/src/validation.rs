// Configuration validation

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

const LARGE_PAGE_SIZE: usize = 10_000;
const LARGE_LATENCY_MS: u64 = 60_000;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_source_config(&config.source)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<()> {
    if config.page_size == 0 {
        bail!("source.page_size must be greater than 0");
    }

    if config.page_size > LARGE_PAGE_SIZE {
        warn!(
            page_size = config.page_size,
            "source.page_size is very large; every fetch materializes a full page"
        );
    }

    if config.latency_ms > LARGE_LATENCY_MS {
        warn!(
            latency_ms = config.latency_ms,
            "source.latency_ms exceeds one minute"
        );
    }

    if let Some(fixture) = &config.fixture {
        if fixture.trim().is_empty() {
            bail!("source.fixture must not be blank when set");
        }
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("logging.level must not be empty");
    }
    Ok(())
}
