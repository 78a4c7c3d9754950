use std::{env, error::Error, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GeneralConfig;

const FORMAT_VAR: &str = "CONFSYNC_LOG_FORMAT";
const DAYS_TO_KEEP: usize = 7;

/// Initialize tracing for the daemon.
///
/// `RUST_LOG` takes precedence over the configured level. Output is pretty
/// unless `CONFSYNC_LOG_FORMAT=json`. When `log_dir` is set, logs are also
/// written to daily rotated files there; keep the returned guard alive for
/// as long as file output is wanted.
///
/// # Errors
/// Returns error if the log directory cannot be used or a subscriber is
/// already installed
pub fn init(general: &GeneralConfig) -> Result<Option<WorkerGuard>, Box<dyn Error>> {
    match &general.log_dir {
        Some(dir) => init_with_file(general, dir).map(Some),
        None => {
            init_console(general)?;
            Ok(None)
        }
    }
}

fn env_filter(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(general.log_level.to_string()))
}

fn json_output() -> bool {
    env::var(FORMAT_VAR).is_ok_and(|format| format == "json")
}

fn init_console(general: &GeneralConfig) -> Result<(), Box<dyn Error>> {
    let registry = tracing_subscriber::registry().with(env_filter(general));

    if json_output() {
        registry
            .with(fmt::layer().json().with_target(true).with_level(true))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true),
            )
            .try_init()?;
    }

    Ok(())
}

/// Initialize tracing with stdout and rotated file output.
///
/// # Errors
/// Returns error if file creation or tracing subscriber initialization fails
pub fn init_with_file(general: &GeneralConfig, dir: &Path) -> Result<WorkerGuard, Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .max_log_files(DAYS_TO_KEEP)
        .filename_prefix("confsyncd")
        .filename_suffix("log")
        .build(dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry().with(env_filter(general));

    if json_output() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(guard)
}
