use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{info, metadata::LevelFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{prelude::*, EnvFilter};

fn do_init(verbose: bool, logfile: Option<PathBuf>) {
    let default_level = if verbose { "debug" } else { "info" };

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
    ));

    let file_layer = logfile.map(|output_dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, output_dir, "snoop.log");

        tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Initialize tracing.
///
/// Will only initialize once, so tests may call this.
pub async fn init(verbose: bool, logfile: Option<PathBuf>) {
    static TRACING_IS_INITIALIZED: RwLock<bool> = RwLock::const_new(false);

    let initialized = { *TRACING_IS_INITIALIZED.read().await };

    if !initialized {
        let mut initialized = TRACING_IS_INITIALIZED.write().await;

        // To avoid race condition between the `.read()` and the
        // `.write()`.
        if *initialized {
            return;
        }

        do_init(verbose, logfile);

        *initialized = true;
    }

    info!("Logging initialized");
}
