//! The closed error taxonomy every pipeline stage reports through.
//!
//! Callers that sit in front of the engine (a web layer, the CLI) only ever
//! see [`TranscriptError`]; [`ErrorKind`] is its fieldless mirror for
//! exhaustive mapping to status codes.

use serde::Serialize;
use std::fmt;

/// Network call a timeout or transport failure happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    VideoPage,
    TimedText,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::VideoPage => write!(f, "video page"),
            Stage::TimedText => write!(f, "timed-text payload"),
        }
    }
}

/// Why a watch page was served behind a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionReason {
    AgeRestricted,
    RegionBlocked,
    LoginRequired,
    ConsentRequired,
}

impl fmt::Display for RestrictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestrictionReason::AgeRestricted => write!(f, "age-restricted"),
            RestrictionReason::RegionBlocked => write!(f, "blocked in this region"),
            RestrictionReason::LoginRequired => write!(f, "requires sign-in"),
            RestrictionReason::ConsentRequired => write!(f, "stuck behind the cookie consent page"),
        }
    }
}

/// Error types produced by the transcript engine
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Invalid video id {input:?}: expected 11 characters of [A-Za-z0-9_-]")]
    InvalidVideoId { input: String },

    #[error("Video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[error("Video {video_id} is {reason}")]
    RestrictedAccess {
        video_id: String,
        reason: RestrictionReason,
    },

    #[error("Transcripts are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcripts available for video {video_id}")]
    NoTranscriptFound { video_id: String },

    #[error("No transcript for video {video_id} in {requested:?}; available: {available:?}")]
    LanguageNotFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Cannot translate transcripts of video {video_id} to {requested:?}; available targets: {available:?}")]
    TranslationUnavailable {
        video_id: String,
        requested: String,
        available: Vec<String>,
    },

    #[error("Transcript {language_code:?} of video {video_id} is not translatable")]
    NotTranslatable {
        video_id: String,
        language_code: String,
    },

    #[error("Failed to fetch the video page: {message}")]
    PageFetchFailed { message: String },

    #[error("Failed to fetch the transcript payload{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    TranscriptFetchFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Too many requests; the platform is rate limiting this client")]
    RateLimited,

    #[error("Failed to parse {what}: {detail}")]
    TranscriptParseError { what: String, detail: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Timed out fetching the {stage}")]
    Timeout { stage: Stage },
}

/// Fieldless mirror of [`TranscriptError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidVideoId,
    VideoUnavailable,
    RestrictedAccess,
    TranscriptsDisabled,
    NoTranscriptFound,
    LanguageNotFound,
    TranslationUnavailable,
    NotTranslatable,
    PageFetchFailed,
    TranscriptFetchFailed,
    RateLimited,
    TranscriptParseError,
    ConfigurationError,
    Timeout,
}

impl ErrorKind {
    /// Status code a web layer should answer with
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidVideoId
            | ErrorKind::TranslationUnavailable
            | ErrorKind::NotTranslatable
            | ErrorKind::ConfigurationError => 400,
            ErrorKind::RestrictedAccess | ErrorKind::TranscriptsDisabled => 403,
            ErrorKind::VideoUnavailable
            | ErrorKind::NoTranscriptFound
            | ErrorKind::LanguageNotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::PageFetchFailed
            | ErrorKind::TranscriptFetchFailed
            | ErrorKind::TranscriptParseError => 502,
            ErrorKind::Timeout => 504,
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidVideoId => 2,
            ErrorKind::ConfigurationError => 3,
            ErrorKind::VideoUnavailable => 10,
            ErrorKind::RestrictedAccess => 11,
            ErrorKind::TranscriptsDisabled => 12,
            ErrorKind::NoTranscriptFound => 13,
            ErrorKind::LanguageNotFound => 14,
            ErrorKind::TranslationUnavailable => 15,
            ErrorKind::NotTranslatable => 16,
            ErrorKind::RateLimited => 20,
            ErrorKind::PageFetchFailed => 21,
            ErrorKind::TranscriptFetchFailed => 22,
            ErrorKind::Timeout => 23,
            ErrorKind::TranscriptParseError => 30,
        }
    }

    /// Whether a caller may reasonably retry later
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::PageFetchFailed
                | ErrorKind::TranscriptFetchFailed
                | ErrorKind::Timeout
        )
    }
}

impl TranscriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscriptError::InvalidVideoId { .. } => ErrorKind::InvalidVideoId,
            TranscriptError::VideoUnavailable { .. } => ErrorKind::VideoUnavailable,
            TranscriptError::RestrictedAccess { .. } => ErrorKind::RestrictedAccess,
            TranscriptError::TranscriptsDisabled { .. } => ErrorKind::TranscriptsDisabled,
            TranscriptError::NoTranscriptFound { .. } => ErrorKind::NoTranscriptFound,
            TranscriptError::LanguageNotFound { .. } => ErrorKind::LanguageNotFound,
            TranscriptError::TranslationUnavailable { .. } => ErrorKind::TranslationUnavailable,
            TranscriptError::NotTranslatable { .. } => ErrorKind::NotTranslatable,
            TranscriptError::PageFetchFailed { .. } => ErrorKind::PageFetchFailed,
            TranscriptError::TranscriptFetchFailed { .. } => ErrorKind::TranscriptFetchFailed,
            TranscriptError::RateLimited => ErrorKind::RateLimited,
            TranscriptError::TranscriptParseError { .. } => ErrorKind::TranscriptParseError,
            TranscriptError::ConfigurationError(_) => ErrorKind::ConfigurationError,
            TranscriptError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Language codes the caller could have asked for instead, when known
    pub fn available_languages(&self) -> Option<&[String]> {
        match self {
            TranscriptError::LanguageNotFound { available, .. }
            | TranscriptError::TranslationUnavailable { available, .. } => Some(available),
            _ => None,
        }
    }

    /// Shorthand for format-drift failures
    pub(crate) fn parse(what: impl Into<String>, detail: impl fmt::Display) -> Self {
        TranscriptError::TranscriptParseError {
            what: what.into(),
            detail: detail.to_string(),
        }
    }
}

/// Body a web layer can serialize next to [`ErrorKind::http_status`]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_languages: Option<Vec<String>>,
}

impl From<&TranscriptError> for ErrorResponse {
    fn from(error: &TranscriptError) -> Self {
        let kind = error.kind();
        Self {
            kind,
            status: kind.http_status(),
            message: error.to_string(),
            available_languages: error.available_languages().map(<[String]>::to_vec),
        }
    }
}

/// Cut a payload down for log lines
pub fn excerpt(payload: &str, max_chars: usize) -> String {
    let mut chars = payload.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
