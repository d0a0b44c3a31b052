use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use videotiler::commands::{completions, divisions, formats, play, title, tools};
use videotiler::logging;
use videotiler::models::ScreenSize;

#[derive(Parser)]
#[command(name = "videotiler")]
#[command(about = "Play a video stream tiled across the whole screen", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a stream and keep it playing
    Play {
        /// Stream URL
        url: String,

        /// Grid divisions per axis (1-50); defaults to the last used value
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=50))]
        divisions: Option<u32>,

        /// Ask before restarting a lost video player
        #[arg(long)]
        confirm: bool,

        /// Seconds to wait for an answer before restarting anyway
        #[arg(long, value_name = "SECS")]
        confirm_timeout: Option<u64>,

        /// Screen size instead of the detected primary monitor
        #[arg(long, value_name = "WIDTHxHEIGHT")]
        screen: Option<ScreenSize>,

        /// Only check that the player process runs, not its window
        #[arg(long)]
        no_probe_windows: bool,
    },

    /// List available encodings and show which one would be played
    Formats {
        /// Stream URL
        url: String,

        /// Grid divisions per axis (1-50)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=50))]
        divisions: Option<u32>,

        /// Screen size instead of the detected primary monitor
        #[arg(long, value_name = "WIDTHxHEIGHT")]
        screen: Option<ScreenSize>,
    },

    /// Print the stream title
    Title {
        /// Stream URL
        url: String,
    },

    /// Show where yt-dlp, ffmpeg and ffplay were found
    Tools,

    /// Show or set the saved grid divisions
    Divisions {
        /// New value (1-50)
        value: Option<u32>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish)
        shell: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Play {
            url,
            divisions,
            confirm,
            confirm_timeout,
            screen,
            no_probe_windows,
        } => play::execute(
            config,
            play::PlayOptions {
                url,
                divisions,
                confirm,
                confirm_timeout,
                screen,
                no_probe_windows,
            },
        ),
        Commands::Formats {
            url,
            divisions,
            screen,
        } => formats::execute(config, &url, divisions, screen),
        Commands::Title { url } => title::execute(config, &url),
        Commands::Tools => tools::execute(config),
        Commands::Divisions { value } => divisions::execute(value),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            completions::execute(&mut cmd, &shell)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_play_arguments() {
        let cli = Cli::try_parse_from([
            "videotiler",
            "-vv",
            "play",
            "https://example.com/v",
            "-d",
            "4",
            "--confirm",
            "--screen",
            "1280x720",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Play {
                url,
                divisions,
                confirm,
                screen,
                ..
            } => {
                assert_eq!(url, "https://example.com/v");
                assert_eq!(divisions, Some(4));
                assert!(confirm);
                assert_eq!(screen, Some(ScreenSize::new(1280, 720)));
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_divisions_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["videotiler", "play", "u", "-d", "51"]).is_err());
        assert!(Cli::try_parse_from(["videotiler", "play", "u", "-d", "0"]).is_err());
    }
}
