//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for PHIScribe using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// PHIScribe - PHI-safe clinical documentation generation
#[derive(Parser, Debug)]
#[command(name = "phiscribe")]
#[command(version, about, long_about = None)]
#[command(author = "PHIScribe Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "phiscribe.toml", env = "PHISCRIBE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PHISCRIBE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate documentation sections from a session transcript
    Generate(commands::generate::GenerateArgs),

    /// Encrypt stdin with the configured key
    Encrypt(commands::crypt::EncryptArgs),

    /// Decrypt stdin with the configured key
    Decrypt(commands::crypt::DecryptArgs),

    /// Print a fresh base64-encoded encryption key
    Keygen(commands::keygen::KeygenArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_generate() {
        let cli = Cli::parse_from([
            "phiscribe",
            "generate",
            "--transcript",
            "session.txt",
            "--identifiers",
            "patient.json",
            "--sections",
            "sections.json",
        ]);
        assert_eq!(cli.config, "phiscribe.toml");
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.transcript, "session.txt");
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["phiscribe", "--config", "custom.toml", "keygen"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Keygen(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["phiscribe", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_decrypt_legacy() {
        let cli = Cli::parse_from(["phiscribe", "decrypt", "--legacy"]);
        match cli.command {
            Commands::Decrypt(args) => assert!(args.legacy),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["phiscribe", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
