use std::fmt::Write as _;

use crate::cli::OutputFormat;
use crate::error::TranscriptError;
use crate::extractors::{CaptionTrack, TrackCatalog};
use crate::transcribe::Transcript;
use crate::Result;

/// Format seconds as `HH:MM:SS<sep>mmm`, rounded to the nearest millisecond
pub fn format_timestamp(seconds: f64, separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    format!("{hours:02}:{minutes:02}:{secs:02}{separator}{ms:03}")
}

/// Parse an SRT (`,`) or WebVTT (`.`) timestamp back into seconds.
///
/// `HH:MM:SS.mmm` and the short `MM:SS.mmm` cue form are both accepted.
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let invalid = || TranscriptError::parse("timestamp", format!("{timestamp:?} is not HH:MM:SS,mmm"));

    let normalized = timestamp.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(invalid()),
    };

    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;

    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return Err(invalid());
    }

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_as_json(transcript),
        OutputFormat::Text => Ok(format_as_text(transcript)),
        OutputFormat::Srt => Ok(format_as_srt(transcript)),
        OutputFormat::Vtt => Ok(format_as_vtt(transcript)),
    }
}

pub fn format_as_json(transcript: &Transcript) -> Result<String> {
    serde_json::to_string_pretty(transcript)
        .map_err(|e| TranscriptError::ConfigurationError(format!("cannot serialize transcript: {e}")))
}

pub fn format_as_text(transcript: &Transcript) -> String {
    transcript.plain_text()
}

pub fn format_as_srt(transcript: &Transcript) -> String {
    let mut out = String::new();

    for (i, segment) in transcript.segments.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(segment.start, ','),
            format_timestamp(segment.end(), ',')
        );
        let _ = writeln!(out, "{}", segment.text);
    }

    out
}

pub fn format_as_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n");

    for segment in &transcript.segments {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(segment.start, '.'),
            format_timestamp(segment.end(), '.')
        );
        let _ = writeln!(out, "{}", segment.text);
    }

    out
}

fn track_line(track: &CaptionTrack) -> String {
    let mut line = format!("  {:<8} {}", track.language_code, track.language);
    if track.is_translatable() {
        line.push_str(&format!(
            " [translatable, {} targets]",
            track.translation_languages.len()
        ));
    }
    line
}

/// Render the track catalog for `list`, as a text table or JSON
pub fn render_catalog(catalog: &TrackCatalog, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(catalog)
            .map_err(|e| TranscriptError::ConfigurationError(format!("cannot serialize catalog: {e}")));
    }

    let mut out = format!("Transcripts for {}\n", catalog.video_id);

    for (title, tracks) in [
        ("Manually created", catalog.manually_created().collect::<Vec<_>>()),
        ("Generated", catalog.generated().collect::<Vec<_>>()),
    ] {
        let _ = writeln!(out, "\n{title}:");
        if tracks.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for track in tracks {
            let _ = writeln!(out, "{}", track_line(track));
        }
    }

    Ok(out)
}
