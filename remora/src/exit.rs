//! Detect a "ctrl-c" notification or other reason to exit.

use anyhow::Result;
use tracing::info;

/// Wait until a SIGINT (ctrl-c) arrives.
///
/// The caller races this against the proxy future; when we return,
/// the event loop is dropped, and in-flight sessions see their
/// operations cancelled.
pub(crate) async fn wait_for_ctrl_c() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received: shutting down");
    Ok(())
}
