//! `raucctl` talks to the RAUC daemon running on this device.
//!
//! It installs bundles, marks slots and prints what the daemon knows about
//! the system. The daemon has to be reachable on the configured bus.

use rauc::control;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    control::execute().await
}
