use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::Transcript;

pub mod formatters;

pub use formatters::*;

/// Save a rendered transcript to file
pub async fn save_to_file(transcript: &Transcript, path: &Path, format: OutputFormat) -> Result<()> {
    let content = render(transcript, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, ensure_trailing_newline(content))
        .with_context(|| format!("Failed to write transcript to {}", path.display()))?;

    Ok(())
}

/// Print a rendered transcript to stdout
pub fn print_to_console(transcript: &Transcript, format: OutputFormat) -> Result<()> {
    let content = render(transcript, format)?;
    print!("{}", ensure_trailing_newline(content));
    Ok(())
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
