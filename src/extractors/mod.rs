use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

pub mod captions;
pub mod json_scan;
pub mod selector;

pub use captions::{locate, CaptionTrack, TrackCatalog, TranslationLanguage};
pub use selector::{select, SelectedTrack, SelectionPreferences};

use crate::config::{GateMarkers, HttpConfig};
use crate::error::{RestrictionReason, Stage, TranscriptError};
use crate::http::{HttpClient, HttpRequest, TransportError};
use crate::Result;

const VIDEO_ID_LEN: usize = 11;
const CONSENT_FORM_MARKER: &str = r#"action="https://consent.youtube.com/s""#;
const CONSENT_TOKEN_MARKER: &str = r#"name="v" value=""#;

/// A syntactically valid YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare identifier. Input is never trimmed or coerced.
    pub fn parse(input: &str) -> Result<Self> {
        let valid = input.len() == VIDEO_ID_LEN
            && input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(Self(input.to_string()))
        } else {
            Err(TranscriptError::InvalidVideoId {
                input: input.to_string(),
            })
        }
    }

    /// Accept either a bare identifier or a watch/short/embed URL
    pub fn from_url_or_id(input: &str) -> Result<Self> {
        if !input.starts_with("http://") && !input.starts_with("https://") {
            return Self::parse(input);
        }

        let invalid = || TranscriptError::InvalidVideoId {
            input: input.to_string(),
        };
        let url = Url::parse(input).map_err(|_| invalid())?;
        let host = url.host_str().unwrap_or_default().trim_start_matches("www.");

        let candidate = match host {
            "youtu.be" => url.path_segments().and_then(|mut s| s.next()).map(str::to_string),
            "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
                let mut segments = url.path_segments().into_iter().flatten();
                match segments.next() {
                    Some("watch") => url
                        .query_pairs()
                        .find(|(key, _)| key == "v")
                        .map(|(_, value)| value.into_owned()),
                    Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
                    _ => None,
                }
            }
            _ => None,
        };

        candidate.ok_or_else(invalid).and_then(|id| Self::parse(&id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Retrieves the raw watch page for a video
pub struct VideoPageFetcher {
    client: Arc<dyn HttpClient>,
    http: HttpConfig,
    markers: GateMarkers,
}

impl VideoPageFetcher {
    pub fn new(client: Arc<dyn HttpClient>, http: HttpConfig, markers: GateMarkers) -> Self {
        Self {
            client,
            http,
            markers,
        }
    }

    fn watch_url(&self, video_id: &VideoId) -> String {
        format!(
            "{}/watch?v={}",
            self.http.base_url.trim_end_matches('/'),
            video_id
        )
    }

    /// Fetch the watch page, following a consent interstitial once
    pub async fn fetch(&self, video_id: &VideoId) -> Result<String> {
        let cookie = self
            .http
            .consent_cookie
            .as_ref()
            .map(|value| format!("CONSENT={value}"));

        let body = self.fetch_once(video_id, cookie).await?;
        if !body.contains(CONSENT_FORM_MARKER) {
            return self.classify(video_id, body);
        }

        tracing::debug!("Consent page served for {}, retrying with consent cookie", video_id);
        let token = consent_token(&body).ok_or_else(|| TranscriptError::RestrictedAccess {
            video_id: video_id.to_string(),
            reason: RestrictionReason::ConsentRequired,
        })?;

        let body = self
            .fetch_once(video_id, Some(format!("CONSENT=YES+{token}")))
            .await?;
        if body.contains(CONSENT_FORM_MARKER) {
            tracing::warn!("Video {} still behind consent page after accepting", video_id);
            return Err(TranscriptError::RestrictedAccess {
                video_id: video_id.to_string(),
                reason: RestrictionReason::ConsentRequired,
            });
        }

        self.classify(video_id, body)
    }

    async fn fetch_once(&self, video_id: &VideoId, cookie: Option<String>) -> Result<String> {
        let mut request = HttpRequest::get(self.watch_url(video_id))
            .header("Accept-Language", self.http.accept_language.as_str());
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }

        tracing::debug!("Fetching watch page: {}", request.url);

        let response = match tokio::time::timeout(self.http.timeout(), self.client.get(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => {
                return Err(TranscriptError::Timeout {
                    stage: Stage::VideoPage,
                })
            }
            Ok(Err(e)) => {
                return Err(TranscriptError::PageFetchFailed {
                    message: e.to_string(),
                })
            }
            Ok(Ok(response)) => response,
        };

        match response.status {
            s if (200..300).contains(&s) => Ok(response.body),
            429 => Err(TranscriptError::RateLimited),
            s if (500..600).contains(&s) => Err(TranscriptError::PageFetchFailed {
                message: format!("HTTP {s}"),
            }),
            s => {
                tracing::warn!("Watch page for {} returned HTTP {}", video_id, s);
                Err(TranscriptError::VideoUnavailable {
                    video_id: video_id.to_string(),
                })
            }
        }
    }

    /// Check a successful page body against the gate marker lists
    fn classify(&self, video_id: &VideoId, body: String) -> Result<String> {
        let hit = |markers: &[String]| markers.iter().any(|m| body.contains(m.as_str()));
        let restricted = |reason: RestrictionReason| -> Result<String> {
            tracing::warn!("Video {} is {}", video_id, reason);
            Err(TranscriptError::RestrictedAccess {
                video_id: video_id.to_string(),
                reason,
            })
        };

        if hit(&self.markers.captcha) {
            tracing::warn!("Captcha served for {}", video_id);
            return Err(TranscriptError::RateLimited);
        }
        if hit(&self.markers.unavailable) {
            tracing::warn!("Video {} reported unavailable by the page", video_id);
            return Err(TranscriptError::VideoUnavailable {
                video_id: video_id.to_string(),
            });
        }
        if hit(&self.markers.age) {
            return restricted(RestrictionReason::AgeRestricted);
        }
        if hit(&self.markers.region) {
            return restricted(RestrictionReason::RegionBlocked);
        }
        if hit(&self.markers.login) {
            return restricted(RestrictionReason::LoginRequired);
        }

        Ok(body)
    }
}

/// Pull the `v` token out of the consent form
fn consent_token(body: &str) -> Option<&str> {
    let start = body.find(CONSENT_TOKEN_MARKER)? + CONSENT_TOKEN_MARKER.len();
    let rest = &body[start..];
    let token = &rest[..rest.find('"')?];
    (!token.is_empty()).then_some(token)
}
