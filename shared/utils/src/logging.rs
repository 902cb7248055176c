use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };

    match (config.format.as_str(), file) {
        ("json", Some(file)) => registry
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE).with_writer(file))
            .try_init()?,
        ("json", None) => registry
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .try_init()?,
        (_, Some(file)) => registry
            .with(fmt::layer().with_span_events(FmtSpan::CLOSE).with_writer(file))
            .try_init()?,
        (_, None) => registry
            .with(fmt::layer().with_span_events(FmtSpan::CLOSE))
            .try_init()?,
    }

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}

#[macro_export]
macro_rules! log_error {
    ($err:expr, $msg:expr) => {
        tracing::error!(error = %$err, $msg);
    };
    ($err:expr, $msg:expr, $($field:tt)*) => {
        tracing::error!(error = %$err, $($field)*, $msg);
    };
}
