use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::TranscriptError;
use crate::extractors::{self, SelectionPreferences, TrackCatalog, VideoId, VideoPageFetcher};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::Result;

pub mod fetcher;
pub mod parser;

pub use fetcher::TranscriptFetcher;
pub use parser::ParseOptions;

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Normalized segment text, lines joined with `\n`
    pub text: String,

    /// Offset from the start of the video in seconds
    pub start: f64,

    /// Display duration in seconds
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A parsed transcript and the track it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,

    /// Display name of the delivered language
    pub language: String,

    /// Code of the delivered text; the translation target when translated
    pub language_code: String,

    pub is_generated: bool,

    /// Source track code when the platform translated the text
    pub translated_from: Option<String>,

    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Segment texts joined one per line
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// End of the last segment, in seconds
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .map(TranscriptSegment::end)
            .fold(0.0, f64::max)
    }
}

/// Main transcript pipeline: page, locate, select, fetch, parse
pub struct TranscriptPipeline {
    config: Config,
    pages: VideoPageFetcher,
    payloads: TranscriptFetcher,
}

impl TranscriptPipeline {
    /// Build a pipeline over an injected HTTP client
    pub fn new(config: Config, client: Arc<dyn HttpClient>) -> Self {
        let pages = VideoPageFetcher::new(
            Arc::clone(&client),
            config.http.clone(),
            config.markers.clone(),
        );
        let payloads = TranscriptFetcher::new(
            client,
            config.http.timeout(),
            config.http.accept_language.clone(),
        );

        Self {
            config,
            pages,
            payloads,
        }
    }

    /// Build a pipeline backed by a reqwest client configured from `config`
    pub fn from_config(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TranscriptError::ConfigurationError(format!("{e:#}")))?;

        let client = ReqwestHttpClient::new(&config.http)
            .map_err(|e| TranscriptError::ConfigurationError(e.to_string()))?;

        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every caption track advertised for a video.
    ///
    /// `video` must be a bare 11-character id; URLs are resolved by the caller
    /// with [`VideoId::from_url_or_id`].
    pub async fn list_transcripts(&self, video: &str) -> Result<TrackCatalog> {
        let video_id = VideoId::parse(video)?;
        tracing::info!("Listing transcripts for video: {}", video_id);

        let page = self.pages.fetch(&video_id).await?;
        let catalog = extractors::locate(&video_id, &page, &self.config.markers)?;

        tracing::info!("Found {} caption tracks for {}", catalog.len(), video_id);
        Ok(catalog)
    }

    /// Fetch and parse one transcript chosen by `prefs`; `video` is a bare id
    pub async fn fetch_transcript(
        &self,
        video: &str,
        prefs: &SelectionPreferences,
        options: ParseOptions,
    ) -> Result<Transcript> {
        let video_id = VideoId::parse(video)?;
        tracing::info!("Fetching transcript for video: {}", video_id);

        let page = self.pages.fetch(&video_id).await?;
        let catalog = extractors::locate(&video_id, &page, &self.config.markers)?;
        tracing::debug!("Caption tracks for {}: {:?}", video_id, catalog.language_codes());

        let selected = extractors::select(&catalog, prefs)?;
        tracing::info!(
            "Selected {} track ({}){}",
            selected.track.language_code,
            if selected.track.is_generated { "generated" } else { "manual" },
            selected
                .translate_to
                .as_ref()
                .map(|t| format!(", translated to {}", t.language_code))
                .unwrap_or_default()
        );

        let payload = self.payloads.fetch(&video_id, &selected).await?;
        let segments = parser::parse(&payload, options)?;
        tracing::info!("Parsed {} segments for {}", segments.len(), video_id);

        let track = selected.track;
        let transcript = match selected.translate_to {
            Some(target) => Transcript {
                video_id: video_id.to_string(),
                language: target.language,
                language_code: target.language_code,
                is_generated: track.is_generated,
                translated_from: Some(track.language_code),
                segments,
            },
            None => Transcript {
                video_id: video_id.to_string(),
                language: track.language,
                language_code: track.language_code,
                is_generated: track.is_generated,
                translated_from: None,
                segments,
            },
        };

        Ok(transcript)
    }
}
