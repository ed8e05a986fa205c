//! Timed-text XML payload parsing.
//!
//! Payloads look like
//! `<transcript><text start="0.0" dur="2.5">Hello &amp;lt;i&amp;gt;there&amp;lt;/i&amp;gt;</text></transcript>`.
//! The inner text is HTML that has been escaped once more for XML, so it is
//! decoded, stripped of tags, then decoded again.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;

use super::TranscriptSegment;
use crate::error::{excerpt, TranscriptError};
use crate::Result;

/// Inline tags kept when formatting is preserved
const FORMATTING_TAGS: &[&str] = &[
    "strong", "em", "b", "i", "mark", "small", "del", "ins", "sub", "sup",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep inline formatting tags (`<b>`, `<i>`, ...) instead of stripping all markup
    pub preserve_formatting: bool,
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?i)</?([a-z][a-z0-9]*)\b[^>]*>").expect("static regex"))
}

/// Remove markup tags, optionally keeping the formatting set
fn strip_tags(text: &str, preserve_formatting: bool) -> String {
    tag_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = caps[1].to_ascii_lowercase();
            if name == "br" {
                "\n".to_string()
            } else if preserve_formatting && FORMATTING_TAGS.contains(&name.as_str()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Decode, strip markup (`<br>` becomes a newline), and normalize line breaks.
///
/// Lines are trimmed, blank lines dropped, and the rest joined with `\n`.
pub fn normalize_text(raw: &str, options: ParseOptions) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let stripped = strip_tags(&decoded, options.preserve_formatting);
    let text = html_escape::decode_html_entities(&stripped);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `<text>` cue being read
struct OpenCue {
    start: f64,
    duration: f64,
    raw: String,
    /// Depth of inline markup elements nested inside the cue
    depth: usize,
}

fn attribute_seconds(element: &BytesStart<'_>, name: &[u8], index: usize) -> Result<Option<f64>> {
    let Some(attr) = element
        .try_get_attribute(name)
        .map_err(|e| TranscriptError::parse("timed-text payload", e))?
    else {
        return Ok(None);
    };

    let raw = attr
        .unescape_value()
        .map_err(|e| TranscriptError::parse("timed-text payload", e))?;
    let value: f64 = raw.trim().parse().map_err(|_| {
        TranscriptError::parse(
            "timed-text payload",
            format!(
                "segment {index}: {} is not a number: {raw:?}",
                String::from_utf8_lossy(name)
            ),
        )
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(TranscriptError::parse(
            "timed-text payload",
            format!(
                "segment {index}: {} out of range: {value}",
                String::from_utf8_lossy(name)
            ),
        ));
    }

    Ok(Some(value))
}

/// Parse a timed-text document into segments, preserving source order
pub fn parse(payload: &str, options: ParseOptions) -> Result<Vec<TranscriptSegment>> {
    parse_segments(payload, options).map_err(|err| {
        tracing::error!(
            payload = %excerpt(payload, 200),
            "Timed-text payload did not parse: {}",
            err
        );
        err
    })
}

fn parse_segments(payload: &str, options: ParseOptions) -> Result<Vec<TranscriptSegment>> {
    let mut reader = Reader::from_str(payload);
    let mut segments = Vec::new();

    let mut current: Option<OpenCue> = None;
    let mut index = 0usize;
    let mut root_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TranscriptError::parse("timed-text payload", e))?;

        if !root_seen {
            if let Event::Start(ref e) | Event::Empty(ref e) = event {
                if e.name().as_ref() != b"transcript" {
                    return Err(TranscriptError::parse(
                        "timed-text payload",
                        format!("unexpected root <{}>", String::from_utf8_lossy(e.name().as_ref())),
                    ));
                }
                root_seen = true;
                continue;
            }
        }

        match event {
            Event::Start(ref e) if current.is_none() && e.name().as_ref() == b"text" => {
                current = Some(open_segment(e, index)?);
            }
            Event::Empty(ref e) if current.is_none() && e.name().as_ref() == b"text" => {
                // Self-closing cue carries no text, but its timing must still be sane
                open_segment(e, index)?;
                index += 1;
            }
            Event::Empty(ref e) if e.name().as_ref() == b"br" => {
                if let Some(cue) = current.as_mut() {
                    cue.raw.push('\n');
                }
            }
            Event::Start(ref e) => {
                // Raw inline markup inside a cue
                if let Some(cue) = current.as_mut() {
                    cue.depth += 1;
                    cue.raw.push('<');
                    cue.raw.push_str(&String::from_utf8_lossy(e));
                    cue.raw.push('>');
                }
            }
            Event::End(ref e) => {
                let Some(cue) = current.as_mut() else {
                    continue;
                };
                if cue.depth > 0 {
                    cue.depth -= 1;
                    cue.raw.push_str("</");
                    cue.raw.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                    cue.raw.push('>');
                    continue;
                }

                let normalized = normalize_text(&cue.raw, options);
                if !normalized.is_empty() {
                    segments.push(TranscriptSegment {
                        text: normalized,
                        start: cue.start,
                        duration: cue.duration,
                    });
                }
                current = None;
                index += 1;
            }
            Event::Text(ref e) => {
                if let Some(cue) = current.as_mut() {
                    // Entities are left encoded here; normalize_text decodes them
                    cue.raw.push_str(
                        std::str::from_utf8(e)
                            .map_err(|e| TranscriptError::parse("timed-text payload", e))?,
                    );
                }
            }
            Event::CData(ref e) => {
                if let Some(cue) = current.as_mut() {
                    cue.raw.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(TranscriptError::parse(
            "timed-text payload",
            "document has no root element",
        ));
    }
    if current.is_some() {
        return Err(TranscriptError::parse(
            "timed-text payload",
            "document ended inside a <text> element",
        ));
    }

    Ok(segments)
}

fn open_segment(element: &BytesStart<'_>, index: usize) -> Result<OpenCue> {
    let start = attribute_seconds(element, b"start", index)?.ok_or_else(|| {
        TranscriptError::parse(
            "timed-text payload",
            format!("segment {index} has no start offset"),
        )
    })?;
    let duration = attribute_seconds(element, b"dur", index)?.unwrap_or(0.0);

    Ok(OpenCue {
        start,
        duration,
        raw: String::new(),
        depth: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const THREE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
    <text start="0.0" dur="2.5">Hello &lt;i&gt;world&lt;/i&gt;</text>
    <text start="2.5" dur="2.5">it&amp;#39;s a &amp;quot;test&amp;quot;</text>
    <text start="5.0" dur="3.0"><b>bold</b> move</text>
</transcript>"#;

    #[test]
    fn test_parse_exact_values_and_order() {
        let segments = parse(THREE, ParseOptions::default()).unwrap();

        assert_eq!(segments.len(), 3);
        let starts: Vec<f64> = segments.iter().map(|s| s.start).collect();
        let durations: Vec<f64> = segments.iter().map(|s| s.duration).collect();
        assert_eq!(starts, vec![0.0, 2.5, 5.0]);
        assert_eq!(durations, vec![2.5, 2.5, 3.0]);
    }

    #[test]
    fn test_parse_strips_markup_and_decodes_entities() {
        let segments = parse(THREE, ParseOptions::default()).unwrap();

        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[1].text, "it's a \"test\"");
        assert_eq!(segments[2].text, "bold move");
    }

    #[test]
    fn test_preserve_formatting_keeps_inline_tags() {
        let xml = r#"<transcript><text start="1" dur="1">&lt;i&gt;soft&lt;/i&gt; &lt;font color="red"&gt;red&lt;/font&gt;</text></transcript>"#;
        let segments = parse(xml, ParseOptions { preserve_formatting: true }).unwrap();
        assert_eq!(segments[0].text, "<i>soft</i> red");
    }

    #[test]
    fn test_missing_duration_defaults_to_zero() {
        let xml = r#"<transcript><text start="1.25">no dur</text></transcript>"#;
        let segments = parse(xml, ParseOptions::default()).unwrap();
        assert_eq!(segments[0].start, 1.25);
        assert_eq!(segments[0].duration, 0.0);
    }

    #[test]
    fn test_missing_start_fails_whole_document() {
        let xml = r#"<transcript><text start="0" dur="1">ok</text><text dur="1">unanchored</text></transcript>"#;
        let err = parse(xml, ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptParseError);
        assert!(err.to_string().contains("segment 1 has no start offset"));
    }

    #[test]
    fn test_non_numeric_timing_is_loud() {
        let xml = r#"<transcript><text start="zero" dur="1">x</text></transcript>"#;
        assert_eq!(
            parse(xml, ParseOptions::default()).unwrap_err().kind(),
            ErrorKind::TranscriptParseError
        );

        let xml = r#"<transcript><text start="1" dur="-2">x</text></transcript>"#;
        assert_eq!(
            parse(xml, ParseOptions::default()).unwrap_err().kind(),
            ErrorKind::TranscriptParseError
        );
    }

    #[test]
    fn test_line_breaks_normalized() {
        let xml = "<transcript><text start=\"0\" dur=\"1\">  first line \n\n   second line  </text></transcript>";
        let segments = parse(xml, ParseOptions::default()).unwrap();
        assert_eq!(segments[0].text, "first line\nsecond line");
    }

    #[test]
    fn test_overlapping_segments_not_resorted() {
        let xml = r#"<transcript><text start="3" dur="1">b</text><text start="1" dur="5">a</text></transcript>"#;
        let segments = parse(xml, ParseOptions::default()).unwrap();
        assert_eq!(segments[0].text, "b");
        assert_eq!(segments[1].text, "a");
    }

    #[test]
    fn test_empty_cues_skipped_but_validated() {
        let xml = r#"<transcript><text start="0" dur="1"></text><text start="1" dur="1"/><text start="2" dur="1">x</text></transcript>"#;
        let segments = parse(xml, ParseOptions::default()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 2.0);

        let xml = r#"<transcript><text dur="1"/></transcript>"#;
        assert!(parse(xml, ParseOptions::default()).is_err());
    }

    #[test]
    fn test_malformed_xml() {
        let xml = r#"<transcript><text start="0" dur="1">unclosed</transcript>"#;
        assert_eq!(
            parse(xml, ParseOptions::default()).unwrap_err().kind(),
            ErrorKind::TranscriptParseError
        );
    }

    #[test]
    fn test_empty_document_has_no_segments() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript></transcript>"#;
        assert!(parse(xml, ParseOptions::default()).unwrap().is_empty());
        assert!(parse("<transcript/>", ParseOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_document_kind_is_loud() {
        let srv3 = r#"<?xml version="1.0" encoding="utf-8" ?><timedtext format="3"><body><p t="0" d="2500">Hello</p><p t="2500" d="1000">again</p></body></timedtext>"#;
        let err = parse(srv3, ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptParseError);
        assert!(err.to_string().contains("unexpected root <timedtext>"));

        let html = "<!DOCTYPE html><html><body><p>Sorry, something went wrong.</p></body></html>";
        let err = parse(html, ParseOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unexpected root <html>"));

        let err = parse("", ParseOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_line_break_markup_becomes_newline() {
        let xml = r#"<transcript><text start="0" dur="1">line one&lt;br/&gt;line two</text><text start="1" dur="1">raw<br/>break</text></transcript>"#;
        let segments = parse(xml, ParseOptions::default()).unwrap();
        assert_eq!(segments[0].text, "line one\nline two");
        assert_eq!(segments[1].text, "raw\nbreak");

        let segments = parse(xml, ParseOptions { preserve_formatting: true }).unwrap();
        assert_eq!(segments[0].text, "line one\nline two");
    }
}
