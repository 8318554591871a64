//! Initialization of the tracing subscriber
//!
//! In the browser, events go to the devtools console. Natively they go to stderr and
//! `RUST_LOG` takes precedence over the requested level.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber logging at `level` ("info", "debug", ...)
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_web::MakeWebConsoleWriter;

    let level: LevelFilter = level.parse().unwrap_or(LevelFilter::INFO);

    // Browsers have neither ANSI colours nor a usable wall clock in `std`
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(level)
        .try_init()?;

    Ok(())
}
