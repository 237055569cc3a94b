//! CLI Command Definitions
//!
//! Argument parsing for every signal-ladder command.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG: &str = "config/default.toml";

/// Signal Ladder - channel-signal trading bot for Solana
#[derive(Parser, Debug)]
#[command(
    name = "signal-ladder",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Channel-signal trading bot for Solana with take-profit ladder and stop-loss",
    long_about = "Signal Ladder buys tokens announced in Telegram signal channels through \
                  Jupiter, exits in take-profit steps on sell alerts and guards every open \
                  position with a stop-loss. Swaps land as Jito bundles."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for signals and monitor open positions
    Run(RunCmd),

    /// Show open positions and their balances
    Status(StatusCmd),

    /// Dry-run the signal parser on a message
    Parse(ParseCmd),

    /// Buy a token once, as if a buy signal arrived
    Buy(TradeCmd),

    /// Sell the next take-profit step of a token
    Sell(TradeCmd),
}

impl Command {
    /// Configuration file the command reads, if any
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Run(cmd) => Some(&cmd.config),
            Command::Status(cmd) => Some(&cmd.config),
            Command::Parse(cmd) => cmd.config.as_deref(),
            Command::Buy(cmd) | Command::Sell(cmd) => Some(&cmd.config),
        }
    }
}

/// Start listener and stop-loss monitor
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Override keypair path
    #[arg(long, value_name = "FILE")]
    pub keypair: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Show open positions
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Skip on-chain balance lookups
    #[arg(long)]
    pub offline: bool,
}

/// Parse a message without trading
#[derive(Parser, Debug)]
pub struct ParseCmd {
    /// Message text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Link attached to the message
    #[arg(short, long, value_name = "URL")]
    pub link: Option<String>,

    /// Read markers from this configuration file instead of the defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// One-shot buy or sell
#[derive(Parser, Debug)]
pub struct TradeCmd {
    /// Token mint address
    #[arg(value_name = "MINT")]
    pub mint: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Override keypair path
    #[arg(long, value_name = "FILE")]
    pub keypair: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_parse_run() {
        let args = vec!["signal-ladder", "run", "--config", "test.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("test.toml"));
                assert!(cmd.rpc_url.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let app = CliApp::try_parse_from(vec!["signal-ladder", "run"]).unwrap();

        match app.command {
            Command::Run(cmd) => assert_eq!(cmd.config, PathBuf::from(DEFAULT_CONFIG)),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_status_json() {
        let app = CliApp::try_parse_from(vec!["signal-ladder", "status", "--format", "json"]).unwrap();

        match app.command {
            Command::Status(cmd) => {
                assert_eq!(cmd.format, OutputFormat::Json);
                assert!(!cmd.offline);
            }
            _ => panic!("Expected Status command"),
        }
    }

    #[test]
    fn test_cli_app_parse_parse() {
        let args = vec!["signal-ladder", "parse", "🔥🔥🔥 X | $1", "--link", "https://x.example/a_Mint"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Parse(cmd) => {
                assert_eq!(cmd.text, "🔥🔥🔥 X | $1");
                assert_eq!(cmd.link.as_deref(), Some("https://x.example/a_Mint"));
                assert!(cmd.config.is_none());
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_cli_app_parse_buy_and_sell() {
        let app = CliApp::try_parse_from(vec!["signal-ladder", "buy", "MintA"]).unwrap();
        assert!(matches!(app.command, Command::Buy(ref cmd) if cmd.mint == "MintA"));

        let app = CliApp::try_parse_from(vec!["signal-ladder", "sell", "MintA", "-c", "x.toml"]).unwrap();
        match app.command {
            Command::Sell(cmd) => assert_eq!(cmd.config, PathBuf::from("x.toml")),
            _ => panic!("Expected Sell command"),
        }
    }

    #[test]
    fn test_buy_requires_mint() {
        assert!(CliApp::try_parse_from(vec!["signal-ladder", "buy"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let app = CliApp::try_parse_from(vec!["signal-ladder", "-v", "--debug", "status"]).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }
}
