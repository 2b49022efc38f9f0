//! # OS termination signals.
//!
//! **Unix:** `SIGINT`, `SIGTERM` and Ctrl-C. **Other platforms:** Ctrl-C via
//! [`tokio::signal::ctrl_c`].

/// Completes when the process receives a termination signal.
///
/// Each call installs its own listeners; an `Err` means installing them failed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

/// Completes when the process receives a termination signal.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
