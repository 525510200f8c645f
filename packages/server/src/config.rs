//! Server configuration read from the environment.

use std::path::PathBuf;

use rem_dashboard_joinpoint::LoadOptions;

/// Default location of the segment export.
pub const DEFAULT_SEGMENTS_PATH: &str = "Joinpoint-Results/Total.Export.APC.txt";
/// Default location of the data export.
pub const DEFAULT_DATA_PATH: &str = "Joinpoint-Results/Total.Export.Data.txt";
/// Default directory of the static frontend.
pub const DEFAULT_STATIC_DIR: &str = "app";
/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Default port.
pub const DEFAULT_PORT: u16 = 8050;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Where to load the joinpoint exports from.
    pub load: LoadOptions,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let delimiter = lookup("JOINPOINT_DELIMITER")
            .as_deref()
            .map_or(b',', parse_delimiter);

        Self {
            bind_addr: var("BIND_ADDR", DEFAULT_BIND_ADDR),
            port,
            load: LoadOptions::new(
                var("JOINPOINT_SEGMENTS_PATH", DEFAULT_SEGMENTS_PATH),
                var("JOINPOINT_DATA_PATH", DEFAULT_DATA_PATH),
            )
            .with_delimiter(delimiter),
            static_dir: PathBuf::from(var("DASHBOARD_STATIC_DIR", DEFAULT_STATIC_DIR)),
        }
    }
}

/// Parses a delimiter setting: `tab` or `\t` for tabs, otherwise the first
/// byte, with `,` for an empty value.
fn parse_delimiter(value: &str) -> u8 {
    match value {
        "tab" | "\\t" | "\t" => b'\t',
        other => other.as_bytes().first().copied().unwrap_or(b','),
    }
}
