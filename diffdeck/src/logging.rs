//! File logging.
//!
//! The terminal belongs to ratatui while the viewer runs, so tracing output
//! goes to `$XDG_STATE_HOME/diffdeck/diffdeck.log` instead. The filter is read
//! from `DIFFDECK_LOG` using the usual `EnvFilter` directive syntax.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "DIFFDECK_LOG";

pub fn init(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_target(true).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init()
        .context("a global tracing subscriber is already installed")?;
    Ok(())
}
