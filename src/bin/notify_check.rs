//! Sends one test notification through the configured transport.
//!
//! Useful for checking relay credentials before starting the server.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use visitor_presence::notify::{build_notifier, dispatch, message};
use visitor_presence::{Notifier, VisitorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("visitor_presence=info")),
        )
        .init();

    let config_path = std::env::var_os("VISITOR_PRESENCE_CONFIG").map(PathBuf::from);
    let config = VisitorConfig::load(config_path.as_deref())?;
    let notifier = build_notifier(&config.email)?;

    println!("Sending test notification via '{}'...", notifier.id());
    dispatch(notifier.as_ref(), &message::test_message(), config.email.timeout())
        .await
        .map_err(|e| anyhow::anyhow!("failed to send test notification: {e}"))?;
    println!("Test notification sent successfully!");
    Ok(())
}
