//! Runtime configuration
//!
//! `Cli` is the command line surface; `Settings` is what the rest of the
//! crate consumes.

use std::time::Duration;

use clap::Parser;

use crate::format::MessageFormat;
use crate::room::DEFAULT_SEND_TIMEOUT;
use crate::transport::TransportKind;

/// Chat room console
#[derive(Parser, Debug)]
#[command(name = "chat_rooms", version, about)]
pub struct Cli {
    /// Transport for rooms created implicitly by join/send (direct, framed)
    #[arg(long, default_value = "direct")]
    pub transport: TransportKind,

    /// Message format applied before sending (plain, html)
    #[arg(long, default_value = "plain")]
    pub format: MessageFormat,

    /// Disable audit logging around operations
    #[arg(long)]
    pub no_audit: bool,

    /// Upper bound for one transport call, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub send_timeout_ms: u64,
}

/// Operation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Transport bound to rooms auto-created by join/send
    pub default_transport: TransportKind,
    pub format: MessageFormat,
    /// Wrap every operation in the audit decorator
    pub audit: bool,
    pub send_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_transport: TransportKind::Direct,
            format: MessageFormat::Plain,
            audit: true,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Self {
            default_transport: cli.transport,
            format: cli.format,
            audit: !cli.no_audit,
            send_timeout: Duration::from_millis(cli.send_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settings_default() {
        let cli = Cli::try_parse_from(["chat_rooms"]).unwrap();
        assert_eq!(Settings::from(cli), Settings::default());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "chat_rooms",
            "--transport",
            "http",
            "--format",
            "html",
            "--no-audit",
            "--send-timeout-ms",
            "250",
        ])
        .unwrap();
        let settings = Settings::from(cli);

        assert_eq!(settings.default_transport, TransportKind::Framed);
        assert_eq!(settings.format, MessageFormat::Html);
        assert!(!settings.audit);
        assert_eq!(settings.send_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_transport_rejected() {
        assert!(Cli::try_parse_from(["chat_rooms", "--transport", "smoke"]).is_err());
    }
}
