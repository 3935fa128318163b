use std::io;
/// Structured logging setup for stackbuild
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Initialize console logging on stderr.
///
/// `debug` lowers the default filter so internal detail shows up; the
/// `RUST_LOG` environment variable still wins when set.
pub fn init_logging(debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if debug {
        "stackbuild=debug"
    } else {
        "stackbuild=warn"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    Registry::default()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();

    Ok(())
}
