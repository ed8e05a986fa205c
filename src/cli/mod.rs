use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TranscriptError;

#[derive(Parser)]
#[command(
    name = "tubescribe",
    about = "Fetch YouTube transcripts straight from the watch page",
    version,
    long_about = "Lists the caption tracks a YouTube video advertises and downloads one of them, optionally machine-translated by the platform, as JSON, plain text, SRT or WebVTT. No API key required."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the caption tracks available for a video
    List {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch one transcript
    Fetch {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Preferred language codes, in order (defaults to the configured list)
        #[arg(short, long, value_name = "LANGS", value_delimiter = ',')]
        languages: Vec<String>,

        /// Ask the platform to translate the transcript into this language
        #[arg(short, long, value_name = "LANG")]
        translate: Option<String>,

        /// Take auto-generated tracks over manually created ones
        #[arg(long)]
        prefer_generated: bool,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep inline formatting tags such as <b> and <i>
        #[arg(long)]
        preserve_formatting: bool,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Transcript record as JSON
    Json,
    /// Plain text, one segment per line
    Text,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            TranscriptError::ConfigurationError(format!(
                "unknown output format {s:?}; expected one of json, text, srt, vtt"
            ))
        })
    }
}
