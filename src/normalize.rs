use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::ScrapeError;

/// First path segments that Instagram also serves under `/p/`.
const POST_ALIASES: &[&str] = &["reel", "reels", "tv", "stories"];

const INSTAGRAM_HOSTS: &[&str] = &["instagram.com", "instagr.am"];

static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(?:p|reels?|tv)/([A-Za-z0-9_-]+)").unwrap());

/// A post URL ready to fetch, plus the shortcode the caller asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUrl {
    pub page: Url,
    pub shortcode: Option<String>,
}

/// Turn user input into the canonical post URL that gets fetched.
pub fn normalize_url(raw: &str, require_instagram_host: bool) -> Result<PostUrl, ScrapeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScrapeError::InvalidUrl(
            "URL parameter is required".to_string(),
        ));
    }

    let lower = raw.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|_| ScrapeError::InvalidUrl("Invalid URL".to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(
            "Only http(s) URLs are allowed".to_string(),
        ));
    }

    if require_instagram_host && !is_instagram_host(&url) {
        return Err(ScrapeError::InvalidUrl(
            "Only instagram.com URLs are allowed".to_string(),
        ));
    }

    // Read before the rewrite: `/stories/<user>/<id>` has no shortcode.
    let code = shortcode(&url);
    if let Some(path) = canonical_post_path(&url) {
        url.set_path(&path);
    }
    Ok(PostUrl {
        page: url,
        shortcode: code,
    })
}

/// The post identifier from a `/p/`, `/reel/` or `/tv/` URL.
fn shortcode(url: &Url) -> Option<String> {
    SHORTCODE_RE
        .captures(url.path())
        .map(|cap| cap[1].to_string())
}

fn is_instagram_host(url: &Url) -> bool {
    let host = url.host_str().unwrap_or("").to_lowercase();
    INSTAGRAM_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
}

fn canonical_post_path(url: &Url) -> Option<String> {
    let mut segments: Vec<&str> = url.path_segments()?.collect();
    let first = segments.first()?.to_ascii_lowercase();
    if !POST_ALIASES.contains(&first.as_str()) {
        return None;
    }
    segments[0] = "p";
    Some(format!("/{}", segments.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(raw: &str) -> String {
        normalize_url(raw, true).unwrap().page.to_string()
    }

    #[test]
    fn reel_tv_and_stories_become_post_paths() {
        assert_eq!(
            normalized("https://www.instagram.com/reel/ABC/"),
            "https://www.instagram.com/p/ABC/"
        );
        assert_eq!(
            normalized("https://www.instagram.com/reels/ABC"),
            "https://www.instagram.com/p/ABC"
        );
        assert_eq!(
            normalized("https://www.instagram.com/tv/XyZ_1-2/"),
            "https://www.instagram.com/p/XyZ_1-2/"
        );
        assert_eq!(
            normalized("https://instagram.com/stories/someone/123/"),
            "https://instagram.com/p/someone/123/"
        );
    }

    #[test]
    fn post_urls_and_query_strings_are_kept() {
        assert_eq!(
            normalized("https://www.instagram.com/p/ABC/?igsh=reel"),
            "https://www.instagram.com/p/ABC/?igsh=reel"
        );
    }

    #[test]
    fn only_the_leading_segment_is_rewritten() {
        assert_eq!(
            normalized("https://www.instagram.com/p/tvshow/"),
            "https://www.instagram.com/p/tvshow/"
        );
        assert_eq!(
            normalized("https://www.instagram.com/reelmaker/"),
            "https://www.instagram.com/reelmaker/"
        );
    }

    #[test]
    fn missing_scheme_defaults_to_https() {
        assert_eq!(
            normalized("  www.instagram.com/reel/ABC  "),
            "https://www.instagram.com/p/ABC"
        );
        assert_eq!(normalized("instagr.am/p/ABC"), "https://instagr.am/p/ABC");
    }

    #[test]
    fn foreign_hosts_are_rejected_when_validation_is_on() {
        let err = normalize_url("https://example.com/reel/ABC", true).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl(_)));
        let err = normalize_url("https://notinstagram.com/p/ABC", true).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl(_)));

        let post = normalize_url("http://127.0.0.1:9000/reel/ABC", false).unwrap();
        assert_eq!(post.page.as_str(), "http://127.0.0.1:9000/p/ABC");
    }

    #[test]
    fn empty_and_malformed_input_is_invalid() {
        assert!(matches!(
            normalize_url("   ", true),
            Err(ScrapeError::InvalidUrl(msg)) if msg == "URL parameter is required"
        ));
        assert!(matches!(
            normalize_url("https://", true),
            Err(ScrapeError::InvalidUrl(_))
        ));
    }

    #[test]
    fn shortcode_is_read_from_post_like_paths() {
        let url = Url::parse("https://www.instagram.com/p/C1a-B_2/").unwrap();
        assert_eq!(shortcode(&url).as_deref(), Some("C1a-B_2"));
        let url = Url::parse("https://www.instagram.com/reel/XYZ?utm=1").unwrap();
        assert_eq!(shortcode(&url).as_deref(), Some("XYZ"));
        let url = Url::parse("https://www.instagram.com/someone/").unwrap();
        assert_eq!(shortcode(&url), None);
    }

    #[test]
    fn shortcode_survives_the_reel_rewrite() {
        let post = normalize_url("https://www.instagram.com/reel/XYZ/?utm=1", true).unwrap();
        assert_eq!(post.page.as_str(), "https://www.instagram.com/p/XYZ/?utm=1");
        assert_eq!(post.shortcode.as_deref(), Some("XYZ"));
    }

    #[test]
    fn stories_have_no_shortcode() {
        let post =
            normalize_url("https://www.instagram.com/stories/someuser/3141/", true).unwrap();
        assert_eq!(post.page.as_str(), "https://www.instagram.com/p/someuser/3141/");
        assert_eq!(post.shortcode, None);
    }
}
