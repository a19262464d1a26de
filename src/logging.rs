//! Logger setup.

use std::path::{Path, PathBuf};

use log::LevelFilter;

/// Environment variable holding `env_logger` filter directives.
pub const FILTER_ENV: &str = "RUST_LOG";

/// Level for a `-v` count: warn by default, info at 1, debug at 2 and above.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Load `.env` (the current directory's unless `env_file` is given), then
/// build a logger whose filters are read from `filter_var`.
///
/// Variables already set in the process are never overridden.
fn prepare(
    verbosity: u8,
    env_file: Option<&Path>,
    filter_var: &str,
) -> (env_logger::Logger, Option<PathBuf>) {
    let loaded = match env_file {
        Some(path) => dotenv::from_path(path).ok().map(|_| path.to_path_buf()),
        None => dotenv::dotenv().ok(),
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_for(verbosity));
    if let Ok(directives) = std::env::var(filter_var) {
        builder.parse_filters(&directives);
    }
    (builder.build(), loaded)
}

/// Load `.env` and initialise `env_logger`. `RUST_LOG` directives, from the
/// environment or `.env`, still apply on top of the verbosity level.
pub fn init(verbosity: u8) {
    let (logger, env_file) = prepare(verbosity, None, FILTER_ENV);
    let max_level = logger.filter();
    // A second init (tests, embedding) is not an error worth reporting.
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
    if let Some(path) = env_file {
        log::debug!("Loaded environment from {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Debug);
    }

    #[test]
    fn test_env_file_filters_reach_logger() {
        let var = "FACE_ATTENDANCE_TEST_LOG_FILTER";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, format!("{}=face_attendance=debug\n", var)).unwrap();

        let (logger, loaded) = prepare(0, Some(&path), var);
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_missing_env_file_keeps_verbosity_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");

        let (logger, loaded) = prepare(1, Some(&path), "FACE_ATTENDANCE_TEST_UNSET_FILTER");
        assert!(loaded.is_none());
        assert_eq!(logger.filter(), LevelFilter::Info);
    }
}
