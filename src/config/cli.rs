use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to dashboard configuration file
    #[arg(long, default_value = "dashboard_config.json")]
    pub config_file: PathBuf,

    /// File holding the last notified RecordUpdate value
    #[arg(long, default_value = "last_record.txt")]
    pub state_file: PathBuf,

    /// Telegram bot token used to push notifications
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat that receives the notifications
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Log messages instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one check and always report, even when nothing changed
    Check,
    /// Extract the dashboard once and print the report as JSON
    Report,
    /// Keep polling the dashboard on a fixed interval. Ctrl-C abandons a poll
    /// in flight: the browser is closed and nothing is sent or stored.
    Watch {
        /// Minutes between two polls
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        interval_minutes: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_is_automatic_poll() {
        let args = Args::try_parse_from(["dashwatch"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.state_file, PathBuf::from("last_record.txt"));
    }

    #[test]
    fn check_subcommand_parses() {
        let args = Args::try_parse_from(["dashwatch", "check"]).unwrap();
        assert_eq!(args.command, Some(Command::Check));
    }

    #[test]
    fn watch_interval_must_be_positive() {
        assert!(Args::try_parse_from(["dashwatch", "watch", "--interval-minutes", "0"]).is_err());

        let args =
            Args::try_parse_from(["dashwatch", "watch", "--interval-minutes", "15"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Watch {
                interval_minutes: 15
            })
        );
    }
}
