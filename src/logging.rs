use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Initialise logging. The level is `info` unless `debug` is set, in which
/// case `RUST_LOG` may override the default `debug` level.
///
/// When `log_file` is given, output is appended to that file instead of
/// stdout. Calling this more than once keeps the first subscriber.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let file_target = log_file.as_ref().and_then(|path| {
        let file_name = path.file_name()?.to_owned();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Some((dir, file_name))
    });

    match file_target {
        Some((dir, file_name)) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy())
                .build(&dir);
            match appender {
                Ok(appender) => {
                    let _ = builder.with_ansi(false).with_writer(appender).try_init();
                }
                Err(e) => {
                    let _ = builder.try_init();
                    tracing::warn!(error = %e, dir = %dir.display(), "log file unavailable; logging to stdout");
                }
            }
        }
        None => {
            let _ = builder.try_init();
        }
    }
}
