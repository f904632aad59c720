// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Voice segment extraction from model completions.
//!
//! Model output uses a speaker-tag convention: a bracketed label
//! `[Voice: <Name>]` immediately followed by a quoted line (straight or curly
//! quotes) marks one spoken line. [`extract_voice_segments`] scans the text
//! left to right and produces the segments in tag order. Text with no tags at
//! all is treated as narration by the reserved narrator voice.
//!
//! Extraction is a pure function: no I/O, deterministic, unit-testable with
//! literal strings.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reserved narrator identifier used when the completion carries no tags.
pub const NARRATOR: &str = "Saga";

/// Tag pattern: `[Voice: Name] "line"`. Quotes may be straight or curly; the
/// line may span newlines (non-greedy up to the closing quote).
static VOICE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\[Voice:\s*([^\]]+)\]\s*["“](.*?)["”]"#)
        .expect("voice tag pattern is valid")
});

/// One attributed spoken line extracted from a completion.
///
/// Created per turn by the extractor, consumed immediately by the synthesis
/// loop, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSegment {
    /// Speaker label, taken verbatim (trimmed) from the tag. No roster
    /// validation is performed.
    pub character: String,
    /// The spoken line, trimmed and non-empty.
    pub line: String,
}

/// The synthesized audio artifact (or failure placeholder) for one segment.
///
/// An empty `url` marks a segment whose synthesis failed; the playback queue
/// skips such clips without attempting playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceClip {
    pub character: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_used: Option<String>,
}

/// Parse completion text into an ordered sequence of voice segments.
///
/// - Every well-formed tag yields one segment, in left-to-right tag order.
/// - Segments whose line trims to empty are dropped silently.
/// - If no segments were collected from non-empty text, the whole trimmed
///   text becomes a single [`NARRATOR`] segment, so downstream synthesis
///   always has something to speak when the model forgot to tag its output.
/// - Empty or whitespace-only text yields an empty sequence.
pub fn extract_voice_segments(text: &str) -> Vec<VoiceSegment> {
    let mut segments = Vec::new();

    for captures in VOICE_TAG.captures_iter(text) {
        let character = captures[1].trim();
        let line = captures[2].trim();
        if !line.is_empty() {
            segments.push(VoiceSegment {
                character: character.to_string(),
                line: line.to_string(),
            });
        }
    }

    if segments.is_empty() {
        let line = text.trim();
        if !line.is_empty() {
            segments.push(VoiceSegment {
                character: NARRATOR.to_string(),
                line: line.to_string(),
            });
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tagged_line() {
        let segments =
            extract_voice_segments(r#"[Voice: Saga] "The torchlight flickers across the ruins.""#);
        assert_eq!(
            segments,
            vec![VoiceSegment {
                character: "Saga".into(),
                line: "The torchlight flickers across the ruins.".into(),
            }]
        );
    }

    #[test]
    fn multiple_tags_preserve_left_to_right_order() {
        let text = concat!(
            "[Voice: Saga] \"The fire crackles softly.\"\n",
            "Some untagged stage direction.\n",
            "[Voice: Nyra] \"Halt! Who goes there?\"\n",
            "[Voice: Thalric] \"Easy, girl.\"",
        );
        let segments = extract_voice_segments(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].character, "Saga");
        assert_eq!(segments[1].character, "Nyra");
        assert_eq!(segments[1].line, "Halt! Who goes there?");
        assert_eq!(segments[2].character, "Thalric");
    }

    #[test]
    fn curly_quotes_accepted() {
        let segments = extract_voice_segments("[Voice: Nyra] “State your business, traveler.”");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].line, "State your business, traveler.");
    }

    #[test]
    fn character_name_is_trimmed_verbatim() {
        let segments = extract_voice_segments(r#"[Voice:   Old Man Harbin ] "Hm.""#);
        assert_eq!(segments[0].character, "Old Man Harbin");
    }

    #[test]
    fn line_may_span_newlines() {
        let segments =
            extract_voice_segments("[Voice: Saga] \"The rain falls.\nThe gates creak open.\"");
        assert_eq!(segments.len(), 1);
        assert!(segments[0].line.contains('\n'));
    }

    #[test]
    fn untagged_text_falls_back_to_narrator() {
        let segments = extract_voice_segments("  The party rests at the crossroads.  ");
        assert_eq!(
            segments,
            vec![VoiceSegment {
                character: NARRATOR.into(),
                line: "The party rests at the crossroads.".into(),
            }]
        );
    }

    #[test]
    fn empty_text_yields_no_segments() {
        assert!(extract_voice_segments("").is_empty());
        assert!(extract_voice_segments("   \n\t ").is_empty());
    }

    #[test]
    fn empty_quoted_lines_are_dropped() {
        let text = r#"[Voice: Saga] "  " [Voice: Nyra] "Hello.""#;
        let segments = extract_voice_segments(text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].character, "Nyra");
    }

    #[test]
    fn all_empty_lines_fall_back_to_narration_of_full_text() {
        // Matches the original behavior: fallback triggers whenever no
        // segments were collected, not only when zero tags matched.
        let text = r#"[Voice: Saga] "   ""#;
        let segments = extract_voice_segments(text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].character, NARRATOR);
        assert_eq!(segments[0].line, text.trim());
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "[Voice: Saga] \"One.\" [Voice: Nyra] \"Two.\"";
        assert_eq!(extract_voice_segments(text), extract_voice_segments(text));
    }

    #[test]
    fn clip_serializes_without_voice_used_when_none() {
        let clip = VoiceClip {
            character: "Saga".into(),
            url: String::new(),
            voice_used: None,
        };
        let json = serde_json::to_string(&clip).unwrap();
        assert!(!json.contains("voice_used"));
    }

    #[test]
    fn clip_serializes_voice_used_when_present() {
        let clip = VoiceClip {
            character: "Nyra".into(),
            url: "https://cdn.example/clip.mp3".into(),
            voice_used: Some("shimmer".into()),
        };
        let json = serde_json::to_string(&clip).unwrap();
        assert!(json.contains("\"voice_used\":\"shimmer\""));
    }
}
