use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use livecheck_core::{classify, EvaluatorConfig, SessionPolicy, DEFAULT_SMILE_THRESHOLD};
use tracing_subscriber::EnvFilter;

mod replay;

#[derive(Parser)]
#[command(name = "livecheck", version, about = "Livecheck liveness challenge tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the direction a yaw angle (degrees) classifies as
    Classify {
        #[arg(allow_hyphen_values = true)]
        yaw: f32,
    },
    /// Replay a JSON-lines event log and print the final challenge state
    Replay {
        /// Event log; reads stdin when omitted
        file: Option<PathBuf>,
        /// Keep checklist progress across sessions
        #[arg(long)]
        carry_over: bool,
        /// Smile probability above which the smile step succeeds
        #[arg(long, default_value_t = DEFAULT_SMILE_THRESHOLD)]
        smile_threshold: f32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Classify { yaw } => {
            println!("{}", classify(yaw));
            Ok(())
        }
        Command::Replay {
            file,
            carry_over,
            smile_threshold,
        } => {
            let config = EvaluatorConfig {
                smile_threshold,
                session_policy: if carry_over {
                    SessionPolicy::CarryOver
                } else {
                    SessionPolicy::Fresh
                },
            };
            replay::run(file, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_yaw_parses() {
        let cli = Cli::try_parse_from(["livecheck", "classify", "-25"]).unwrap();
        assert!(matches!(cli.command, Command::Classify { yaw } if yaw == -25.0));
    }

    #[test]
    fn test_replay_flags() {
        let cli = Cli::try_parse_from([
            "livecheck",
            "replay",
            "session.jsonl",
            "--carry-over",
            "--smile-threshold",
            "0.7",
        ])
        .unwrap();
        match cli.command {
            Command::Replay {
                file,
                carry_over,
                smile_threshold,
            } => {
                assert_eq!(file, Some(PathBuf::from("session.jsonl")));
                assert!(carry_over);
                assert_eq!(smile_threshold, 0.7);
            }
            _ => panic!("expected replay"),
        }
    }
}
