pub const START_LYRICS: &str = "[START_LYRICS]";
pub const END_LYRICS: &str = "[END_LYRICS]";

/// A chat reply split into conversational text and a lyrics block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsSplit {
    pub talk: String,
    pub lyrics: Option<String>,
}

/// Pull the text between the lyrics markers out of a reply.
///
/// Without both markers in order there is no lyrics block, and a dangling
/// start marker is dropped from the talk text.
pub fn split_lyrics(text: &str) -> LyricsSplit {
    let Some(start) = text.find(START_LYRICS) else {
        return LyricsSplit {
            talk: text.trim().to_string(),
            lyrics: None,
        };
    };

    let before = &text[..start];
    let rest = &text[start + START_LYRICS.len()..];

    let Some(end) = rest.find(END_LYRICS) else {
        return LyricsSplit {
            talk: format!("{}{}", before, rest).trim().to_string(),
            lyrics: None,
        };
    };

    let lyrics = rest[..end].trim();
    let after = rest[end + END_LYRICS.len()..].trim();
    let talk = match (before.trim(), after) {
        (b, "") => b.to_string(),
        ("", a) => a.to_string(),
        (b, a) => format!("{}\n\n{}", b, a),
    };

    LyricsSplit {
        talk,
        lyrics: (!lyrics.is_empty()).then(|| lyrics.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extracts_block() {
        let split = split_lyrics("Here it is:\n[START_LYRICS]\nLine one\nLine two\n[END_LYRICS]");
        assert_eq!(split.talk, "Here it is:");
        assert_eq!(split.lyrics.as_deref(), Some("Line one\nLine two"));
    }

    #[test]
    fn test_text_after_block_is_kept() {
        let split = split_lyrics("Sure.\n[START_LYRICS]\nA\n[END_LYRICS]\nEnjoy singing!");
        assert_eq!(split.talk, "Sure.\n\nEnjoy singing!");
        assert_eq!(split.lyrics.as_deref(), Some("A"));
    }

    #[test]
    fn test_no_markers() {
        let split = split_lyrics("  I could not find that hymn.  ");
        assert_eq!(split.talk, "I could not find that hymn.");
        assert_eq!(split.lyrics, None);
    }

    #[test]
    fn test_missing_end_marker_has_no_lyrics() {
        let split = split_lyrics("Here:\n[START_LYRICS]\nLine one");
        assert_eq!(split.lyrics, None);
        assert_eq!(split.talk, "Here:\n\nLine one");
    }
}
