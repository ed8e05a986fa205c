use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::{Stage, TranscriptError};
use crate::extractors::{SelectedTrack, VideoId};
use crate::http::{HttpClient, HttpRequest, TransportError};
use crate::Result;

/// Downloads the timed-text payload of a selected track
pub struct TranscriptFetcher {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
    accept_language: String,
}

impl TranscriptFetcher {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration, accept_language: String) -> Self {
        Self {
            client,
            timeout,
            accept_language,
        }
    }

    /// Payload URL, with `tlang` appended when a translation was selected
    pub fn payload_url(selected: &SelectedTrack) -> Result<String> {
        let mut url = Url::parse(&selected.track.base_url)
            .map_err(|e| TranscriptError::parse("caption track URL", e))?;

        if let Some(target) = &selected.translate_to {
            url.query_pairs_mut()
                .append_pair("tlang", &target.language_code);
        }

        Ok(url.to_string())
    }

    pub async fn fetch(&self, video_id: &VideoId, selected: &SelectedTrack) -> Result<String> {
        let url = Self::payload_url(selected)?;
        tracing::debug!("Fetching timed text: {}", url);

        let request = HttpRequest::get(url).header("Accept-Language", self.accept_language.as_str());

        let response = match tokio::time::timeout(self.timeout, self.client.get(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => {
                return Err(TranscriptError::Timeout {
                    stage: Stage::TimedText,
                })
            }
            Ok(Err(e)) => {
                return Err(TranscriptError::TranscriptFetchFailed {
                    status: None,
                    message: e.to_string(),
                })
            }
            Ok(Ok(response)) => response,
        };

        if response.status == 429 {
            return Err(TranscriptError::RateLimited);
        }
        if !response.is_success() {
            return Err(TranscriptError::TranscriptFetchFailed {
                status: Some(response.status),
                message: "unexpected status from timed-text endpoint".to_string(),
            });
        }

        if response.body.trim().is_empty() {
            tracing::warn!(
                "Track {} of {} advertised but returned an empty payload",
                selected.track.language_code,
                video_id
            );
            return Err(TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
            });
        }

        Ok(response.body)
    }
}
