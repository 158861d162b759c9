mod line;
mod relay_rewriter;
mod resolve;

use url::Url;

pub use line::{classify, key_uri_pattern, PlaylistLine};
pub use relay_rewriter::{encode_url_component, RelayPaths, RelayRewriter};
pub use resolve::{base_url, resolve_reference};

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const PLAYLIST_EXTENSION: &str = ".m3u8";
pub const KEY_DIRECTIVE: &str = "#EXT-X-KEY";

/// Turns the text of an upstream playlist into the text served to the player.
///
/// Implementations never fail: lines they can't make sense of are handed
/// through as they are.
pub trait PlaylistRewriter: Send + Sync {
    fn rewrite_playlist(&self, playlist: &str, playlist_url: &Url) -> String;
}
