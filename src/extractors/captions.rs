use serde::{Deserialize, Serialize};
use url::Url;

use super::json_scan::{self, ScanError};
use super::VideoId;
use crate::config::GateMarkers;
use crate::error::{excerpt, TranscriptError};
use crate::Result;

const CAPTIONS_MARKER: &str = r#""captions":"#;

/// A language a caption track can be machine-translated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// One subtitle stream advertised by the watch page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Display name, e.g. "English (auto-generated)"
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    /// Timed-text URL, without any format override
    pub base_url: String,
    pub translation_languages: Vec<TranslationLanguage>,
}

impl CaptionTrack {
    pub fn is_translatable(&self) -> bool {
        !self.translation_languages.is_empty()
    }

    pub fn can_translate_to(&self, language_code: &str) -> bool {
        self.translation_languages
            .iter()
            .any(|t| t.language_code == language_code)
    }
}

/// Every caption track found for one video, in page order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackCatalog {
    pub video_id: VideoId,
    pub tracks: Vec<CaptionTrack>,
}

impl TrackCatalog {
    pub fn manually_created(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.tracks.iter().filter(|t| !t.is_generated)
    }

    pub fn generated(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.tracks.iter().filter(|t| t.is_generated)
    }

    /// Distinct language codes in first-seen order
    pub fn language_codes(&self) -> Vec<String> {
        dedup(self.tracks.iter().map(|t| t.language_code.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

pub(crate) fn dedup<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for code in codes {
        if !seen.iter().any(|s| s == code) {
            seen.push(code.to_string());
        }
    }
    seen
}

// Player response shapes. Everything is optional so that unrelated upstream
// changes do not break decoding.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CaptionsBlock {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TracklistRenderer {
    caption_tracks: Option<Vec<RawTrack>>,
    translation_languages: Vec<RawTranslationLanguage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTrack {
    base_url: String,
    name: Option<Label>,
    language_code: String,
    kind: Option<String>,
    is_translatable: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTranslationLanguage {
    language_code: String,
    language_name: Option<Label>,
}

/// Text that appears either as `simpleText` or as a list of `runs`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Label {
    simple_text: Option<String>,
    runs: Vec<Run>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Run {
    text: String,
}

impl Label {
    fn text(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            let joined: String = self.runs.iter().map(|r| r.text.as_str()).collect();
            (!joined.is_empty()).then_some(joined)
        })
    }
}

/// Strip `fmt=...` so the server answers with the classic XML payload
fn strip_format_param(base_url: &str) -> String {
    let Ok(mut url) = Url::parse(base_url) else {
        return base_url.replace("&fmt=srv3", "");
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

fn drift(video_id: &VideoId, page: &str, detail: impl std::fmt::Display) -> TranscriptError {
    tracing::error!(
        video_id = %video_id,
        payload = %excerpt(page, 200),
        "Caption metadata did not parse: {}",
        detail
    );
    TranscriptError::parse("caption metadata", detail)
}

/// Extract the caption catalog embedded in a watch page
pub fn locate(video_id: &VideoId, page: &str, markers: &GateMarkers) -> Result<TrackCatalog> {
    let block = match json_scan::extract_after_marker(page, CAPTIONS_MARKER) {
        Ok(block) => block,
        Err(ScanError::MarkerNotFound(_)) => {
            let disabled = markers
                .captions_disabled
                .iter()
                .any(|m| page.contains(m.as_str()));

            return Err(if disabled {
                tracing::info!("Video {} has a player but no captions", video_id);
                TranscriptError::TranscriptsDisabled {
                    video_id: video_id.to_string(),
                }
            } else {
                tracing::info!("No caption metadata on page for {}", video_id);
                TranscriptError::NoTranscriptFound {
                    video_id: video_id.to_string(),
                }
            });
        }
        Err(e) => return Err(drift(video_id, page, e)),
    };

    let captions: CaptionsBlock =
        serde_json::from_str(block).map_err(|e| drift(video_id, block, e))?;

    let disabled = || TranscriptError::TranscriptsDisabled {
        video_id: video_id.to_string(),
    };
    let renderer = captions.player_captions_tracklist_renderer.ok_or_else(disabled)?;
    let raw_tracks = renderer.caption_tracks.ok_or_else(disabled)?;

    if raw_tracks.is_empty() {
        return Err(TranscriptError::NoTranscriptFound {
            video_id: video_id.to_string(),
        });
    }

    let translation_languages: Vec<TranslationLanguage> = renderer
        .translation_languages
        .iter()
        .map(|t| TranslationLanguage {
            language: t
                .language_name
                .as_ref()
                .and_then(Label::text)
                .unwrap_or_else(|| t.language_code.clone()),
            language_code: t.language_code.clone(),
        })
        .collect();

    let mut tracks = Vec::with_capacity(raw_tracks.len());
    for raw in raw_tracks {
        if raw.base_url.is_empty() || raw.language_code.is_empty() {
            return Err(drift(
                video_id,
                block,
                "caption track without baseUrl or languageCode",
            ));
        }

        tracks.push(CaptionTrack {
            language: raw
                .name
                .as_ref()
                .and_then(Label::text)
                .unwrap_or_else(|| raw.language_code.clone()),
            is_generated: raw.kind.as_deref() == Some("asr"),
            base_url: strip_format_param(&raw.base_url),
            translation_languages: if raw.is_translatable {
                translation_languages.clone()
            } else {
                Vec::new()
            },
            language_code: raw.language_code,
        });
    }

    tracing::debug!("Located {} caption tracks for {}", tracks.len(), video_id);

    Ok(TrackCatalog {
        video_id: video_id.clone(),
        tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn id() -> VideoId {
        VideoId::parse("abc123XYZ_-").unwrap()
    }

    fn page(captions: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"responseContext":{{}},"playabilityStatus":{{"status":"OK"}},"captions":{captions},"videoDetails":{{"videoId":"abc123XYZ_-","title":"A {{curly}} title"}}}};</script></html>"#
        )
    }

    const THREE_TRACKS: &str = r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[
        {"baseUrl":"https://www.youtube.com/api/timedtext?v=abc123XYZ_-&lang=en","name":{"simpleText":"English"},"languageCode":"en","isTranslatable":true},
        {"baseUrl":"https://www.youtube.com/api/timedtext?v=abc123XYZ_-&lang=en&kind=asr&fmt=srv3","name":{"runs":[{"text":"English (auto-generated)"}]},"languageCode":"en","kind":"asr","isTranslatable":true},
        {"baseUrl":"https://www.youtube.com/api/timedtext?v=abc123XYZ_-&lang=de","name":{"simpleText":"Deutsch"},"languageCode":"de","isTranslatable":false}
    ],"translationLanguages":[
        {"languageCode":"es","languageName":{"simpleText":"Spanish"}},
        {"languageCode":"fr","languageName":{"runs":[{"text":"French"}]}}
    ]}}"#;

    #[test]
    fn test_locate_preserves_order_and_count() {
        let catalog = locate(&id(), &page(THREE_TRACKS), &GateMarkers::default()).unwrap();

        assert_eq!(catalog.len(), 3);
        let summary: Vec<(&str, bool)> = catalog
            .tracks
            .iter()
            .map(|t| (t.language_code.as_str(), t.is_generated))
            .collect();
        assert_eq!(summary, vec![("en", false), ("en", true), ("de", false)]);
        assert_eq!(catalog.language_codes(), vec!["en", "de"]);
    }

    #[test]
    fn test_locate_reads_names_and_translations() {
        let catalog = locate(&id(), &page(THREE_TRACKS), &GateMarkers::default()).unwrap();

        assert_eq!(catalog.tracks[0].language, "English");
        assert_eq!(catalog.tracks[1].language, "English (auto-generated)");
        assert!(catalog.tracks[0].can_translate_to("fr"));
        assert_eq!(catalog.tracks[0].translation_languages[1].language, "French");
        assert!(!catalog.tracks[2].is_translatable());
        assert_eq!(catalog.manually_created().count(), 2);
        assert_eq!(catalog.generated().count(), 1);
    }

    #[test]
    fn test_locate_strips_format_override() {
        let catalog = locate(&id(), &page(THREE_TRACKS), &GateMarkers::default()).unwrap();
        assert_eq!(
            catalog.tracks[1].base_url,
            "https://www.youtube.com/api/timedtext?v=abc123XYZ_-&lang=en&kind=asr"
        );
    }

    #[test]
    fn test_disabled_vs_absent() {
        let markers = GateMarkers::default();

        let disabled_page = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"videoDetails":{}};</script>"#;
        let err = locate(&id(), disabled_page, &markers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptsDisabled);

        let bare_page = "<html><body>nothing to see</body></html>";
        let err = locate(&id(), bare_page, &markers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoTranscriptFound);
    }

    #[test]
    fn test_renderer_without_tracks_is_disabled() {
        let markers = GateMarkers::default();

        let err = locate(&id(), &page(r#"{"playerCaptionsRenderer":{}}"#), &markers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptsDisabled);

        let err = locate(
            &id(),
            &page(r#"{"playerCaptionsTracklistRenderer":{"audioTracks":[]}}"#),
            &markers,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptsDisabled);
    }

    #[test]
    fn test_empty_track_list_is_no_transcript() {
        let err = locate(
            &id(),
            &page(r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[]}}"#),
            &GateMarkers::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoTranscriptFound);
    }

    #[test]
    fn test_malformed_block_is_parse_error() {
        let markers = GateMarkers::default();

        let truncated = r#"<script>{"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[</script>"#;
        let err = locate(&id(), truncated, &markers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptParseError);

        let invalid = page(r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[{baseUrl:1}]}}"#);
        let err = locate(&id(), &invalid, &markers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptParseError);
    }

    #[test]
    fn test_track_without_url_is_parse_error() {
        let err = locate(
            &id(),
            &page(r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[{"languageCode":"en"}]}}"#),
            &GateMarkers::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptParseError);
    }

    #[test]
    fn test_strip_format_param() {
        assert_eq!(
            strip_format_param("https://x.test/api/timedtext?fmt=srv3"),
            "https://x.test/api/timedtext"
        );
        assert_eq!(
            strip_format_param("https://x.test/api/timedtext?v=1&lang=en"),
            "https://x.test/api/timedtext?v=1&lang=en"
        );
    }
}
