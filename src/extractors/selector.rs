use serde::{Deserialize, Serialize};

use super::captions::{dedup, CaptionTrack, TrackCatalog, TranslationLanguage};
use crate::error::TranscriptError;
use crate::Result;

/// Caller preferences for picking a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPreferences {
    /// Language codes in order of preference; empty means "platform default"
    pub languages: Vec<String>,

    /// Among tracks sharing a code, take the manually created one
    pub prefer_manual: bool,

    /// Ask the platform for a machine translation into this language
    pub translate_to: Option<String>,
}

impl Default for SelectionPreferences {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            prefer_manual: true,
            translate_to: None,
        }
    }
}

impl SelectionPreferences {
    pub fn languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn prefer_manual(mut self, prefer_manual: bool) -> Self {
        self.prefer_manual = prefer_manual;
        self
    }

    pub fn translate_to(mut self, code: impl Into<String>) -> Self {
        self.translate_to = Some(code.into());
        self
    }
}

/// The track to fetch, plus the translation target if one applies
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTrack {
    pub track: CaptionTrack,
    pub translate_to: Option<TranslationLanguage>,
}

/// First track for `code` in catalog order, manual first when asked
fn pick<'a>(catalog: &'a TrackCatalog, code: &str, prefer_manual: bool) -> Option<&'a CaptionTrack> {
    let mut matching = catalog.tracks.iter().filter(|t| t.language_code == code);
    let first = matching.clone().next()?;

    if prefer_manual {
        Some(matching.find(|t| !t.is_generated).unwrap_or(first))
    } else {
        Some(first)
    }
}

/// Deterministically choose one track from the catalog
pub fn select(catalog: &TrackCatalog, prefs: &SelectionPreferences) -> Result<SelectedTrack> {
    let video_id = catalog.video_id.to_string();

    let preferred = || {
        prefs
            .languages
            .iter()
            .filter_map(|code| pick(catalog, code, prefs.prefer_manual))
    };

    let language_not_found = || TranscriptError::LanguageNotFound {
        video_id: video_id.clone(),
        requested: prefs.languages.clone(),
        available: catalog.language_codes(),
    };

    let Some(target) = prefs.translate_to.as_deref() else {
        let track = if prefs.languages.is_empty() {
            catalog.tracks.first()
        } else {
            preferred().next()
        };

        return track
            .map(|track| SelectedTrack {
                track: track.clone(),
                translate_to: None,
            })
            .ok_or_else(language_not_found);
    };

    // A native track in the target language needs no translation
    if let Some(track) = pick(catalog, target, prefs.prefer_manual) {
        return Ok(SelectedTrack {
            track: track.clone(),
            translate_to: None,
        });
    }

    let candidates: Vec<&CaptionTrack> = if prefs.languages.is_empty() {
        catalog.tracks.iter().collect()
    } else {
        preferred().collect()
    };

    if candidates.is_empty() {
        return Err(language_not_found());
    }

    for track in &candidates {
        if let Some(language) = track
            .translation_languages
            .iter()
            .find(|t| t.language_code == target)
        {
            tracing::debug!(
                "Translating {} track of {} to {}",
                track.language_code,
                video_id,
                target
            );
            return Ok(SelectedTrack {
                track: (*track).clone(),
                translate_to: Some(language.clone()),
            });
        }
    }

    if candidates.iter().all(|t| !t.is_translatable()) {
        return Err(TranscriptError::NotTranslatable {
            video_id,
            language_code: candidates[0].language_code.clone(),
        });
    }

    Err(TranscriptError::TranslationUnavailable {
        video_id,
        requested: target.to_string(),
        available: dedup(
            candidates
                .iter()
                .flat_map(|t| t.translation_languages.iter())
                .map(|t| t.language_code.as_str()),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::VideoId;
    use crate::ErrorKind;

    fn track(code: &str, generated: bool, targets: &[&str]) -> CaptionTrack {
        CaptionTrack {
            language: code.to_uppercase(),
            language_code: code.to_string(),
            is_generated: generated,
            base_url: format!("https://x.test/timedtext?lang={code}&asr={generated}"),
            translation_languages: targets
                .iter()
                .map(|t| TranslationLanguage {
                    language: t.to_uppercase(),
                    language_code: t.to_string(),
                })
                .collect(),
        }
    }

    fn catalog(tracks: Vec<CaptionTrack>) -> TrackCatalog {
        TrackCatalog {
            video_id: VideoId::parse("abc123XYZ_-").unwrap(),
            tracks,
        }
    }

    fn fixture() -> TrackCatalog {
        catalog(vec![
            track("en", false, &["es", "fr"]),
            track("en", true, &["es", "fr"]),
            track("de", false, &[]),
        ])
    }

    fn summary(selected: &SelectedTrack) -> (&str, bool, Option<&str>) {
        (
            selected.track.language_code.as_str(),
            selected.track.is_generated,
            selected.translate_to.as_ref().map(|t| t.language_code.as_str()),
        )
    }

    #[test]
    fn test_preferred_order_wins() {
        let prefs = SelectionPreferences::default().languages(["de", "en"]);
        let selected = select(&fixture(), &prefs).unwrap();
        assert_eq!(summary(&selected), ("de", false, None));
    }

    #[test]
    fn test_falls_back_to_later_preference() {
        let prefs = SelectionPreferences::default().languages(["ja", "de"]);
        let selected = select(&fixture(), &prefs).unwrap();
        assert_eq!(summary(&selected), ("de", false, None));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let prefs = SelectionPreferences::default().languages(["en"]);
        let first = select(&fixture(), &prefs).unwrap();
        for _ in 0..10 {
            assert_eq!(select(&fixture(), &prefs).unwrap(), first);
        }
    }

    #[test]
    fn test_prefer_manual_tie_break() {
        // generated listed first on purpose
        let catalog = catalog(vec![track("en", true, &[]), track("en", false, &[])]);

        let manual = select(&catalog, &SelectionPreferences::default().languages(["en"])).unwrap();
        assert_eq!(summary(&manual), ("en", false, None));

        let first = select(
            &catalog,
            &SelectionPreferences::default().languages(["en"]).prefer_manual(false),
        )
        .unwrap();
        assert_eq!(summary(&first), ("en", true, None));
    }

    #[test]
    fn test_no_preferences_takes_first_track() {
        let catalog = catalog(vec![track("de", true, &[]), track("en", false, &[])]);
        let selected = select(&catalog, &SelectionPreferences::default()).unwrap();
        assert_eq!(summary(&selected), ("de", true, None));
    }

    #[test]
    fn test_language_not_found_lists_available() {
        let prefs = SelectionPreferences::default().languages(["ja", "ko"]);
        let err = select(&fixture(), &prefs).unwrap_err();
        assert_eq!(
            err,
            TranscriptError::LanguageNotFound {
                video_id: "abc123XYZ_-".to_string(),
                requested: vec!["ja".to_string(), "ko".to_string()],
                available: vec!["en".to_string(), "de".to_string()],
            }
        );
    }

    #[test]
    fn test_translation_of_preferred_source() {
        let prefs = SelectionPreferences::default().languages(["en"]).translate_to("es");
        let selected = select(&fixture(), &prefs).unwrap();
        assert_eq!(summary(&selected), ("en", false, Some("es")));
        assert_eq!(selected.translate_to.unwrap().language, "ES");
    }

    #[test]
    fn test_translation_scans_catalog_without_preferences() {
        let prefs = SelectionPreferences::default().translate_to("fr");
        let selected = select(&fixture(), &prefs).unwrap();
        assert_eq!(summary(&selected), ("en", false, Some("fr")));
    }

    #[test]
    fn test_translation_prefers_native_track() {
        let prefs = SelectionPreferences::default().languages(["en"]).translate_to("de");
        let selected = select(&fixture(), &prefs).unwrap();
        assert_eq!(summary(&selected), ("de", false, None));
    }

    #[test]
    fn test_translation_unavailable_lists_targets() {
        let prefs = SelectionPreferences::default().languages(["en"]).translate_to("ja");
        let err = select(&fixture(), &prefs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranslationUnavailable);
        assert_eq!(err.available_languages().unwrap(), ["es", "fr"]);
    }

    #[test]
    fn test_not_translatable_source() {
        let catalog = catalog(vec![track("de", false, &[]), track("en", false, &["es"])]);
        let prefs = SelectionPreferences::default().languages(["de"]).translate_to("es");
        let err = select(&catalog, &prefs).unwrap_err();
        assert_eq!(
            err,
            TranscriptError::NotTranslatable {
                video_id: "abc123XYZ_-".to_string(),
                language_code: "de".to_string(),
            }
        );
    }

    #[test]
    fn test_translation_with_missing_source_language() {
        let prefs = SelectionPreferences::default().languages(["ja"]).translate_to("es");
        let err = select(&fixture(), &prefs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LanguageNotFound);
    }
}
