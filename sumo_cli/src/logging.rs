//! `tracing` subscriber setup.
//!
//! Console output goes to stderr (compact, or JSON with `--json`) so stdout
//! stays clean for command output. `RUST_LOG` overrides `--log-level`. When
//! `[logging].file` is set, JSON lines are also written there through a
//! non-blocking appender whose guard lives in [`FILE_GUARD`].

use std::path::Path;

use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(level: &str, json: bool) -> BoxedLayer {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    }
}

fn file_layer(cfg: &sumo_config::Logging) -> eyre::Result<Option<BoxedLayer>> {
    let Some(file) = cfg.file.as_deref() else {
        return Ok(None);
    };
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;

    let appender = match cfg.rotation.as_deref().unwrap_or("never") {
        "never" => tracing_appender::rolling::never(dir, name),
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        other => eyre::bail!("logging.rotation must be never, daily or hourly, got '{other}'"),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let level = cfg.level.as_deref().unwrap_or("info");
    Ok(Some(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(level))
            .boxed(),
    ))
}

/// Install the global subscriber. Call once, after the config is loaded.
pub fn init(level: &str, json: bool, cfg: &sumo_config::Logging) -> eyre::Result<()> {
    let mut layers = vec![console_layer(level, json)];
    if let Some(file) = file_layer(cfg)? {
        layers.push(file);
    }
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}
