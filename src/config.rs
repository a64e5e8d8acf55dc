//! Command-line and environment configuration.
use log::LevelFilter;
use std::{ffi::OsString, path::PathBuf};
use thiserror::Error;

/// Environment variable holding the base log level.
pub const LOG_ENV: &str = "FATSH_LOG";

pub const USAGE: &str = "\
Usage: fatsh [-v|-q] <IMAGE>

  -v          Log more (repeatable: info, debug, trace)
  -q          Only log errors
  -h, --help  Print this help

The base log level comes from FATSH_LOG (off, error, warn, info, debug, trace)
and defaults to warn.
";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Help requested")]
    HelpRequested,
    #[error("Missing image path")]
    MissingImage,
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Invalid log level in {LOG_ENV}: {0}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    image: PathBuf,
    log_level: LevelFilter,
}

impl Config {
    /// Reads the process arguments and the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let level = std::env::var(LOG_ENV).ok();
        Self::parse(std::env::args_os().skip(1), level.as_deref())
    }

    /// Builds a configuration from arguments (program name excluded) and the
    /// value of [`LOG_ENV`], if set.
    pub fn parse<I, S>(args: I, env_level: Option<&str>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut log_level = match env_level.map(str::trim) {
            None | Some("") => LevelFilter::Warn,
            Some(level) => level
                .parse()
                .map_err(|_| ConfigError::InvalidLogLevel(level.to_owned()))?,
        };
        let mut image = None;

        for arg in args {
            let arg: OsString = arg.into();
            let text = arg.to_str().map(str::to_owned);
            match text.as_deref() {
                Some("-h" | "--help") => return Err(ConfigError::HelpRequested),
                Some("-q") => log_level = LevelFilter::Error,
                Some(flag) if flag.len() > 1 && flag.starts_with('-') => {
                    if !flag[1..].bytes().all(|b| b == b'v') {
                        return Err(ConfigError::UnknownOption(flag.to_owned()));
                    }
                    for _ in 1..flag.len() {
                        log_level = more_verbose(log_level);
                    }
                }
                _ if image.is_none() => image = Some(PathBuf::from(arg)),
                _ => {
                    return Err(ConfigError::UnexpectedArgument(
                        arg.to_string_lossy().into_owned(),
                    ));
                }
            }
        }

        Ok(Self {
            image: image.ok_or(ConfigError::MissingImage)?,
            log_level,
        })
    }

    #[must_use]
    #[inline]
    pub fn image(&self) -> &std::path::Path {
        &self.image
    }

    #[must_use]
    #[inline]
    pub const fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

const fn more_verbose(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Off => LevelFilter::Error,
        LevelFilter::Error => LevelFilter::Warn,
        LevelFilter::Warn => LevelFilter::Info,
        LevelFilter::Info => LevelFilter::Debug,
        LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
    }
}
