//! TubeScribe - fetch YouTube transcripts without the official API
//!
//! The library scrapes the caption metadata embedded in a video's watch page,
//! picks a caption track by language preference (optionally asking the
//! platform to translate it), downloads the timed-text payload and parses it
//! into timed segments. Every failure is reported as a [`TranscriptError`].

pub mod cli;
pub mod config;
pub mod error;
pub mod extractors;
pub mod http;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use error::{ErrorKind, ErrorResponse, RestrictionReason, Stage, TranscriptError};
pub use extractors::{CaptionTrack, SelectionPreferences, TrackCatalog, VideoId};
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient, TransportError};
pub use transcribe::{ParseOptions, Transcript, TranscriptPipeline, TranscriptSegment};

/// Result type used throughout the library
pub type Result<T, E = TranscriptError> = std::result::Result<T, E>;
