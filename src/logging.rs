//! Tracing subscriber setup

use crate::config::current_time_stamp;
use crate::error::{PipelineError, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "concrete_strength=info,concrete=info";

pub fn log_file_name() -> String {
    format!("log_{}.log", current_time_stamp())
}

/// Install the global subscriber: stderr always, plus a plain-text file in
/// `log_dir` when given. Returns the log file path.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name());
            let file = File::create(&path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::ConfigError(format!("Cannot install logger: {}", e)))?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_is_time_stamped() {
        let name = log_file_name();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".log"));
        // log_YYYY-mm-dd-HH-MM-SS.log
        assert_eq!(name.len(), "log_".len() + 19 + ".log".len());
    }
}
