use url::{ParseError, Url};

/// The fetch url cut off after its last `/`.
///
/// Relative references of one playlist are all resolved against this, so it
/// is computed once per playlist.
pub fn base_url(playlist_url: &Url) -> Url {
    let url = playlist_url.as_str();

    match url.rfind('/') {
        Some(idx) => Url::parse(&url[..=idx]).unwrap_or_else(|_| playlist_url.clone()),
        None => playlist_url.clone(),
    }
}

/// Returns `reference` untouched when it is already absolute, otherwise the
/// reference resolved against `base`.
pub fn resolve_reference(reference: &str, base: &Url) -> Result<String, ParseError> {
    if is_absolute(reference) {
        return Ok(reference.to_string());
    }

    base.join(reference).map(|url| url.to_string())
}

fn is_absolute(reference: &str) -> bool {
    reference.starts_with("http")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_base_url_strips_last_segment() {
        assert_eq!(
            base_url(&url("https://cdn.example.com/videos/top.m3u8")).as_str(),
            "https://cdn.example.com/videos/"
        );
        assert_eq!(
            base_url(&url("https://cdn.example.com/videos/")).as_str(),
            "https://cdn.example.com/videos/"
        );
        assert_eq!(
            base_url(&url("https://cdn.example.com")).as_str(),
            "https://cdn.example.com/"
        );
    }

    #[test]
    fn test_relative_reference() {
        let base = url("https://cdn.example.com/videos/");

        assert_eq!(
            resolve_reference("seg/low/001.ts", &base).unwrap(),
            "https://cdn.example.com/videos/seg/low/001.ts"
        );
        assert_eq!(
            resolve_reference("../audio/en.m3u8", &base).unwrap(),
            "https://cdn.example.com/audio/en.m3u8"
        );
        assert_eq!(
            resolve_reference("./002.ts", &base).unwrap(),
            "https://cdn.example.com/videos/002.ts"
        );
        assert_eq!(
            resolve_reference("/root.ts", &base).unwrap(),
            "https://cdn.example.com/root.ts"
        );
        assert_eq!(
            resolve_reference("//other.example.com/a.ts", &base).unwrap(),
            "https://other.example.com/a.ts"
        );
    }

    #[test]
    fn test_absolute_reference_is_returned_unchanged() {
        let base = url("https://cdn.example.com/videos/");

        for reference in &[
            "https://edge.example.com/a/b.ts?token=x%2Fy",
            "http://edge.example.com/../odd.ts",
        ] {
            assert_eq!(resolve_reference(reference, &base).unwrap(), *reference);
        }
    }

    #[test]
    fn test_nested_base_resolves_relative_to_own_playlist() {
        let nested = url(
            &resolve_reference("sub/playlist.m3u8", &url("https://cdn.example.com/videos/"))
                .unwrap(),
        );

        assert_eq!(
            resolve_reference("001.ts", &base_url(&nested)).unwrap(),
            "https://cdn.example.com/videos/sub/001.ts"
        );
    }
}
