use regex::Regex;
use std::ops::Range;

use super::{KEY_DIRECTIVE, PLAYLIST_EXTENSION};

const KEY_URI_PATTERN: &str = r#"URI="([^"]+)""#;

pub fn key_uri_pattern() -> Regex {
    Regex::new(KEY_URI_PATTERN).expect("key uri pattern is a valid regex")
}

/// A single trimmed playlist line and what the relay has to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistLine<'a> {
    /// `#EXT-X-KEY` directive; `uri` is the byte range of the quoted `URI` value
    Key { line: &'a str, uri: Range<usize> },
    NestedPlaylist(&'a str),
    Segment(&'a str),
    PassThrough(&'a str),
}

/// Classifies a raw playlist line.
///
/// Order matters: the key directive is checked first, then the nested playlist
/// extension, everything else that is neither a tag/comment nor empty is a
/// segment.
pub fn classify<'a>(line: &'a str, key_uri_pattern: &Regex) -> PlaylistLine<'a> {
    let line = line.trim();

    if line.starts_with(KEY_DIRECTIVE) {
        return match key_uri_pattern.captures(line).and_then(|c| c.get(1)) {
            Some(uri) => PlaylistLine::Key {
                line,
                uri: uri.range(),
            },
            None => PlaylistLine::PassThrough(line),
        };
    }

    if line.starts_with('#') || line.is_empty() {
        PlaylistLine::PassThrough(line)
    } else if line.ends_with(PLAYLIST_EXTENSION) {
        PlaylistLine::NestedPlaylist(line)
    } else {
        PlaylistLine::Segment(line)
    }
}
