use anyhow::Result;
use roster_core::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod capture;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rosterd starting");

    let config = Config::from_env();
    let stop = Arc::new(AtomicBool::new(false));

    let signal_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("stop requested; finishing current frame");
                signal_stop.store(true, Ordering::Relaxed);
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    // The capture loop is synchronous and owns the camera and the store.
    let stats = tokio::task::spawn_blocking(move || capture::run(&config, &stop)).await??;

    tracing::info!(
        frames = stats.frames,
        faces = stats.faces,
        recorded = stats.recorded,
        storage_failures = stats.storage_failures,
        "rosterd shutting down"
    );

    Ok(())
}
