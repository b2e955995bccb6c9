//! Logging initialization for the `mosaic` tool using `tracing` and `tracing-subscriber`.
//!
//! Output is controlled by:
//! - [`EnvFilter`]: log level filtering, read from `RUST_LOG`
//! - [`LogFormat`]: output format, read from `MOSAIC_FORMAT`

use std::io;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, single-line logs.
    Full,
    /// A variant of the full format, optimized for short line lengths (release default).
    Compact,
    /// Compact logs without timestamps, targets or ANSI colors.
    Bare,
    /// Multi-line logs for local debugging (debug build default).
    Pretty,
    /// Newline-delimited JSON logs.
    Json,
}

impl LogFormat {
    /// Install a global subscriber writing to stderr in this format.
    ///
    /// Stdout is reserved for command output such as manifest paths or NDJSON rows.
    pub fn init(self, env_filter: EnvFilter) -> Result<(), String> {
        let dispatch = match self {
            Self::Full => tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Compact => tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .compact()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Pretty => tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .pretty()
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Bare => tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .compact()
                .with_span_events(FmtSpan::NONE)
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Json => tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
        };
        tracing::dispatcher::set_global_default(dispatch)
            .map_err(|e| format!("failed to set global default subscriber: {e}"))
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "bare" => Ok(Self::Bare),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: json, full, compact, bare or pretty"
            )),
        }
    }
}

/// Initialize the global tracing subscriber for the given filter and format.
///
/// An unparsable filter falls back to `debug`, and an unknown format to [`LogFormat::default`].
pub fn init_tracing(filter: &str, format: Option<String>) -> Result<(), String> {
    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid filter string '{filter}' passed, using 'debug' instead");
        EnvFilter::new("debug")
    });

    let log_format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!(
                        "Falling back to default format ({:?})",
                        LogFormat::default()
                    );
                })
                .ok()
        })
        .unwrap_or_default();

    log_format.init(env_filter)
}

/// Make the library target `mosaic_tools` log at the same level as the `mosaic` binary.
///
/// Without `RUST_LOG`, both default to `info`.
#[must_use]
pub fn ensure_tools_log_level_matches(env_filter: Option<String>) -> String {
    const BIN: &str = "mosaic=";
    const LIB: &str = "mosaic_tools=";

    let Some(rust_log) = env_filter else {
        return format!("{BIN}info,{LIB}info");
    };
    if rust_log.contains(LIB) {
        return rust_log;
    }
    match rust_log.split(',').find_map(|s| s.strip_prefix(BIN)) {
        Some(level) => format!("{rust_log},{LIB}{level}"),
        None => rust_log,
    }
}
