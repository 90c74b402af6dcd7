pub mod process;

pub use process::{ProcessOutput, is_process_alive, kill_process, run_with_timeout};

use sshvol_shared::errors::{SshvolError, SshvolResult};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::driver::constants::logging as const_logging;
use crate::driver::options::LoggingOptions;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `options.level`. With `log_dir` set, events go to a
/// daily rolling file through a non-blocking writer; the returned guard must
/// be kept alive to flush it. Without `log_dir`, events go to stderr.
///
/// Installing twice is not an error: the first subscriber stays in place.
pub fn init_logging(options: &LoggingOptions) -> SshvolResult<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| {
            SshvolError::Config(format!("invalid log level '{}': {}", options.level, e))
        })?;

    match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                SshvolError::Config(format!(
                    "failed to create log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::daily(dir, const_logging::FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            register_to_tracing(non_blocking, env_filter);
            Ok(Some(guard))
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_env_filter(env_filter)
                .try_init();
            Ok(None)
        }
    }
}

pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}
