use log::warn;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use url::Url;

use super::{
    base_url, classify, key_uri_pattern, resolve_reference, PlaylistLine, PlaylistRewriter,
};

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the unreserved set browsers
/// leave alone in `encodeURIComponent`.
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes `value` for use as a single query parameter value.
pub fn encode_url_component(value: &str) -> String {
    utf8_percent_encode(value, URL_COMPONENT).to_string()
}

/// Relay routes the rewritten references point at.
#[derive(Debug, Clone)]
pub struct RelayPaths {
    pub playlist: String,
    pub segment: String,
    pub key: String,
}

impl Default for RelayPaths {
    fn default() -> Self {
        RelayPaths {
            playlist: String::from("/stream"),
            segment: String::from("/segment"),
            key: String::from("/key"),
        }
    }
}

fn with_url_query(route: &str, url: &str) -> String {
    format!("{}?url={}", route, encode_url_component(url))
}

/// Points every playlist, segment and key reference back at the relay.
pub struct RelayRewriter {
    paths: RelayPaths,
    key_uri_pattern: Regex,
}

impl RelayRewriter {
    pub fn new(paths: RelayPaths) -> Self {
        RelayRewriter {
            paths,
            key_uri_pattern: key_uri_pattern(),
        }
    }

    fn rewrite_line(&self, line: &str, base: &Url) -> String {
        let line = classify(line, &self.key_uri_pattern);

        match line {
            PlaylistLine::Key { line, uri } => {
                match self.relay_reference(&line[uri.clone()], base, &self.paths.key) {
                    Some(key_path) => {
                        format!("{}{}{}", &line[..uri.start], key_path, &line[uri.end..])
                    }
                    None => line.to_string(),
                }
            }
            PlaylistLine::NestedPlaylist(reference) => self
                .relay_reference(reference, base, &self.paths.playlist)
                .unwrap_or_else(|| reference.to_string()),
            PlaylistLine::Segment(reference) => self
                .relay_reference(reference, base, &self.paths.segment)
                .unwrap_or_else(|| reference.to_string()),
            PlaylistLine::PassThrough(line) => line.to_string(),
        }
    }

    fn relay_reference(&self, reference: &str, base: &Url, route: &str) -> Option<String> {
        match resolve_reference(reference, base) {
            Ok(url) => Some(with_url_query(route, &url)),
            Err(e) => {
                warn!(
                    "Failed to resolve reference `{}` against `{}`: {}",
                    reference, base, e
                );
                None
            }
        }
    }
}

impl Default for RelayRewriter {
    fn default() -> Self {
        RelayRewriter::new(RelayPaths::default())
    }
}

impl PlaylistRewriter for RelayRewriter {
    fn rewrite_playlist(&self, playlist: &str, playlist_url: &Url) -> String {
        let base = base_url(playlist_url);

        playlist
            .split('\n')
            .map(|line| self.rewrite_line(line, &base))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
