use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the stderr log subscriber. Fails if one is already set.
pub fn init(debug: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug)
                .with_filter(level),
        )
        .try_init()
}
