// Logging module - Logging infrastructure
use crate::domain::config::GlobalConfig;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// `RUST_LOG` wins when set; otherwise the configured log level applies to
/// this crate's targets.
pub fn init_logging(config: &GlobalConfig) -> Result<(), Box<dyn std::error::Error>> {
    let fallback = format!("ctrlcom={},warn,error", config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    tracing::info!("CtrlCom logging system initialized");
    Ok(())
}
