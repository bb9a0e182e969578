//! `sheetfill_log` v1:
//! Process-wide `tracing` subscriber setup shared by the CLI and the
//! Python extension.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Default verbosity when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl EnumLogLevel {
    /// Filter directive text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Level for `-v` / `-q` style counters: quiet wins, each `-v` steps up from `warn`.
    pub fn from_verbosity(n_verbose: u8, if_quiet: bool) -> Self {
        if if_quiet {
            return Self::Error;
        }
        match n_verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl fmt::Display for EnumLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnumLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!(
                "Invalid log level: {other:?}. Expected one of: error, warn, info, debug, trace."
            )),
        }
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` overrides `level`.
///
/// Returns an error string (never panics) when a global subscriber is
/// already installed.
pub fn init_tracing(level: EnumLogLevel) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("Failed to initialize logging: {err}"))
}
