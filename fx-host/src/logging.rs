//! Log subscriber setup for hosts

use anyhow::{anyhow, Result};
use tracing::Level;

/// Install a `fmt` subscriber: DEBUG when `verbose`, INFO otherwise.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("Failed to install log subscriber: {error}"))?;

    Ok(())
}
