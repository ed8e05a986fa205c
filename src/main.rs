use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tubescribe::cli::{Cli, Commands};
use tubescribe::config::Config;
use tubescribe::extractors::{SelectionPreferences, VideoId};
use tubescribe::transcribe::{ParseOptions, TranscriptPipeline};
use tubescribe::{output, utils, TranscriptError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<TranscriptError>()
                .map(|e| e.kind().exit_code())
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose {
        "tubescribe=debug"
    } else {
        "tubescribe=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries the transcript
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message.to_string());
    progress.enable_steady_tick(Duration::from_millis(100));
    Some(progress)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()
        .await
        .map_err(|e| TranscriptError::ConfigurationError(format!("{e:#}")))?;

    match cli.command {
        Commands::List { video, json } => {
            let video_id = VideoId::from_url_or_id(&video)?;
            let pipeline = TranscriptPipeline::from_config(config)?;

            let progress = spinner(cli.quiet, "Reading caption tracks...");
            let catalog = pipeline.list_transcripts(video_id.as_str()).await;
            if let Some(progress) = progress {
                progress.finish_and_clear();
            }

            print!("{}", output::render_catalog(&catalog?, json)?);
        }
        Commands::Fetch {
            video,
            languages,
            translate,
            prefer_generated,
            format,
            output: output_path,
            preserve_formatting,
        } => {
            let video_id = VideoId::from_url_or_id(&video)?;
            let languages = if languages.is_empty() {
                config.transcripts.default_languages.clone()
            } else {
                languages
            };

            let mut prefs = SelectionPreferences::default()
                .languages(utils::normalize_language_codes(languages))
                .prefer_manual(!prefer_generated && config.transcripts.prefer_manual);
            if let Some(target) = translate.as_deref().map(str::trim) {
                prefs = prefs.translate_to(target);
            }

            let format = match format {
                Some(format) => format,
                None => config.transcripts.default_format.parse()?,
            };
            let options = ParseOptions {
                preserve_formatting: preserve_formatting || config.transcripts.preserve_formatting,
            };

            let pipeline = TranscriptPipeline::from_config(config)?;

            let progress = spinner(cli.quiet, "Fetching transcript...");
            let transcript = pipeline.fetch_transcript(video_id.as_str(), &prefs, options).await;
            if let Some(progress) = progress {
                progress.finish_and_clear();
            }
            let transcript = transcript?;

            match output_path {
                Some(path) => {
                    output::save_to_file(&transcript, &path, format).await?;
                    println!(
                        "Transcript ({}, {} segments, {}) saved to: {}",
                        transcript.language_code,
                        transcript.segments.len(),
                        utils::format_duration(transcript.duration()),
                        path.display()
                    );
                }
                None => {
                    output::print_to_console(&transcript, format)?;
                }
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default_path()?;
                if path.exists() {
                    println!("Configuration already exists at: {}", path.display());
                } else {
                    Config::default().save(&path).await?;
                    println!("Default configuration written to: {}", path.display());
                }
            }
            if show || !init {
                config.display();
            }
        }
    }

    Ok(())
}
