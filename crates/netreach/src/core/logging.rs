//! Tracing setup for hosts of the engine
//!
//! The library only emits events; a binary (or a test) installs the
//! subscriber once with [`init_logging`]. Output goes to stderr so command
//! output on stdout stays machine-readable.
//!
//! ```rust,no_run
//! use netreach::core::logging::init_logging;
//!
//! init_logging(Some("debug"), Some("json")).unwrap();
//! ```
//!
//! What shows up at each level:
//!
//! - `trace`: adjacency inserts and BFS visits
//! - `debug`: derived edge sets, merge decisions, skipped writes, drafts
//! - `info`: snapshot writes, clears, completed syncs
//! - `warn`: unreadable snapshots or drafts that were ignored
//!
//! Resolution order for the filter is the `level` argument, then
//! `NETREACH_LOG_LEVEL`, then `RUST_LOG`, then `info`. The format comes from
//! the `format` argument, then `NETREACH_LOG_FORMAT`, then `compact`.
//! Any `EnvFilter` directive works as a level:
//!
//! ```bash
//! NETREACH_LOG_LEVEL="warn,netreach::core::sync=debug" netreach sync --input home.json
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

/// Env var read when no level is passed
pub const LEVEL_ENV: &str = "NETREACH_LOG_LEVEL";

/// Env var read when no format is passed
pub const FORMAT_ENV: &str = "NETREACH_LOG_FORMAT";

const FALLBACK_LEVEL: &str = "info";

/// Output shape of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, no span noise
    #[default]
    Compact,
    /// Multi-line with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Unknown log format '{}' (expected one of: {})",
                s,
                LogFormat::variants().join(", ")
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl LogFormat {
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Filter directive and format after applying the fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve against the process environment
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, String> {
        Self::resolve_with(level, format, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with(
        level: Option<&str>,
        format: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let directive = level
            .map(str::to_string)
            .or_else(|| lookup(LEVEL_ENV))
            .or_else(|| lookup("RUST_LOG"))
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_LEVEL.to_string());

        let format = match format.map(str::to_string).or_else(|| lookup(FORMAT_ENV)) {
            Some(name) => name.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self { directive, format })
    }

    /// Filter for the directive; an unparsable directive falls back to `info`
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
    }

    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let base = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        match self.format {
            LogFormat::Compact => base
                .with_target(false)
                .with_span_events(FmtSpan::NONE)
                .compact()
                .boxed(),
            LogFormat::Pretty => base
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::ACTIVE)
                .pretty()
                .boxed(),
            LogFormat::Json => base
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::ACTIVE)
                .json()
                .boxed(),
        }
    }
}

/// Install the global subscriber
///
/// Fails on an unknown format or when a subscriber is already installed;
/// the format is checked before anything global is touched.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = LogSettings::resolve(level, format)?;
    Registry::default()
        .with(settings.filter())
        .with(settings.layer())
        .try_init()?;
    Ok(())
}
