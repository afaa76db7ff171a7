//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for safra
#[derive(Parser, Debug)]
#[command(name = "safra")]
#[command(author, version, about = "CPR assistant chat client")]
#[command(long_about = r#"
Safra is a chat client for the CPR document assistant backend.

The first message of a conversation goes through a one-shot exchange that
allocates the session; follow-ups stream the answer token by token.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./safra.toml        Project-level config
3. ~/.config/safra/config.toml   Global config

Example:
  safra "What does clause 4 of this CPR mean?"
  safra --chat
  safra --chat --session 2f9c01
"#)]
pub struct Cli {
    /// The message to send (not required in chat mode)
    pub message: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Resume a specific session id
    #[arg(long, value_name = "SESSION_ID")]
    pub session: Option<String>,

    /// Ignore any stored session and start a fresh conversation
    #[arg(long)]
    pub new_session: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress banners and decorations
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_message() {
        let cli = Cli::parse_from(["safra", "hello there"]);
        assert_eq!(cli.message.as_deref(), Some("hello there"));
        assert!(!cli.chat);
    }

    #[test]
    fn parses_chat_mode_with_session() {
        let cli = Cli::parse_from(["safra", "--chat", "--session", "s1", "-vv"]);
        assert!(cli.chat);
        assert_eq!(cli.session.as_deref(), Some("s1"));
        assert_eq!(cli.verbose, 2);
    }
}
