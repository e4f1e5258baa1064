//! Visitor register server.
//!
//! Loads configuration, opens the visitor log, starts the daily summary
//! scheduler and serves the HTTP surface until interrupted. A visitor log
//! that exists but cannot be parsed stops start-up.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use visitor_presence::http::VisitorServer;
use visitor_presence::notify::build_notifier;
use visitor_presence::visitor::{JsonFilePersistence, StoreOptions};
use visitor_presence::{PresenceStore, SummaryScheduler, VisitorConfig};

/// Environment variable naming an explicit TOML config file.
const CONFIG_ENV: &str = "VISITOR_PRESENCE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("visitor_presence=info,reqwest=warn")),
        )
        .init();

    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = VisitorConfig::load(config_path.as_deref())?;

    let notifier = build_notifier(&config.email)?;
    let persistence = Arc::new(JsonFilePersistence::new(&config.store.path));
    let options = StoreOptions {
        io_timeout: config.store.io_timeout(),
        notify_timeout: config.email.timeout(),
    };
    let store = PresenceStore::open(persistence, Arc::clone(&notifier), options).map_err(|e| {
        tracing::error!(
            path = %config.store.path.display(),
            error = %e,
            "refusing to start with unreadable visitor log"
        );
        anyhow::anyhow!("cannot open visitor log: {e}")
    })?;
    let store = Arc::new(store);

    let scheduler = config.summary.enabled.then(|| {
        SummaryScheduler::new(Arc::clone(&store), notifier, config.summary.time)
            .with_tick_interval(config.summary.tick_interval())
            .with_notify_timeout(config.email.timeout())
            .run()
    });

    let mut server = VisitorServer::start(store, &config.server).await?;

    tokio::select! {
        () = server.wait() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("cannot listen for ctrl-c: {e}");
            }
            info!("shutting down");
        }
    }

    server.shutdown();
    if let Some(scheduler) = scheduler {
        scheduler.abort();
    }
    Ok(())
}
