use std::fmt;

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::ScrapeError;
use crate::models::{Dimensions, MediaKind, MediaReference, Owner, PostDetails};

// ── Lazy statics ─────────────────────────────────────────────────────────────

static OG_VIDEO_SELECTORS: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        Selector::parse(r#"meta[property="og:video"]"#).unwrap(),
        Selector::parse(r#"meta[property="og:video:secure_url"]"#).unwrap(),
    ]
});

static OG_IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

static JSONLD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static SHARED_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\._sharedData\s*=\s*").unwrap());

static VIDEO_URL_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""video_url"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

const SHORTCODE_MEDIA_PATH: &str = "/entry_data/PostPage/0/graphql/shortcode_media";

// ── Types ────────────────────────────────────────────────────────────────────

/// Which probe produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    OpenGraphVideo,
    OpenGraphImage,
    JsonLd,
    SharedData,
    VideoUrlField,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::OpenGraphVideo => "og:video",
            Strategy::OpenGraphImage => "og:image",
            Strategy::JsonLd => "ld+json",
            Strategy::SharedData => "_sharedData",
            Strategy::VideoUrlField => "video_url",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub media: MediaReference,
    pub strategy: Strategy,
    /// Only the `_sharedData` probe fills this in.
    pub details: Option<PostDetails>,
}

impl Extraction {
    fn new(strategy: Strategy, url: String, kind: MediaKind) -> Self {
        Self {
            media: MediaReference { url, kind },
            strategy,
            details: None,
        }
    }

    /// Absolute media URL, resolving relative references against the page.
    pub fn resolve(&self, page_url: &Url) -> Option<Url> {
        page_url.join(&self.media.url).ok()
    }
}

/// The fetched page for a single request. The DOM is parsed on first use.
pub struct ExtractionContext<'a> {
    html: &'a str,
    source_url: &'a Url,
    document: OnceCell<Html>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(html: &'a str, source_url: &'a Url) -> Self {
        Self {
            html,
            source_url,
            document: OnceCell::new(),
        }
    }

    fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(self.html))
    }
}

type Probe = fn(&ExtractionContext<'_>) -> Option<Extraction>;

/// Probes in the order they are tried; the first hit wins.
const PROBES: &[Probe] = &[
    og_video,
    og_image,
    json_ld,
    shared_data,
    video_url_field,
];

// ── Public API ───────────────────────────────────────────────────────────────

pub fn extract_media(html: &str, source_url: &Url) -> Result<Extraction, ScrapeError> {
    run_probes(&ExtractionContext::new(html, source_url))
}

pub fn run_probes(ctx: &ExtractionContext<'_>) -> Result<Extraction, ScrapeError> {
    for probe in PROBES {
        if let Some(found) = probe(ctx) {
            tracing::info!(
                strategy = %found.strategy,
                kind = ?found.media.kind,
                page = %ctx.source_url,
                "media found"
            );
            return Ok(found);
        }
    }
    tracing::debug!(page = %ctx.source_url, bytes = ctx.html.len(), "no probe matched");
    Err(ScrapeError::MediaNotFound)
}

// ── Meta tag probes ──────────────────────────────────────────────────────────

fn og_video(ctx: &ExtractionContext<'_>) -> Option<Extraction> {
    OG_VIDEO_SELECTORS
        .iter()
        .find_map(|sel| meta_content(ctx.document(), sel))
        .map(|url| Extraction::new(Strategy::OpenGraphVideo, url, MediaKind::Video))
}

fn og_image(ctx: &ExtractionContext<'_>) -> Option<Extraction> {
    meta_content(ctx.document(), &OG_IMAGE_SELECTOR)
        .map(|url| Extraction::new(Strategy::OpenGraphImage, url, MediaKind::Image))
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

// ── Structured data probe ────────────────────────────────────────────────────

fn json_ld(ctx: &ExtractionContext<'_>) -> Option<Extraction> {
    ctx.document()
        .select(&JSONLD_SELECTOR)
        .find_map(|script| {
            let text: String = script.text().collect();
            // Malformed blocks are skipped, not reported.
            let value: Value = serde_json::from_str(text.trim()).ok()?;
            json_ld_media(&value)
        })
        .map(|media| Extraction::new(Strategy::JsonLd, media.url, media.kind))
}

fn json_ld_media(value: &Value) -> Option<MediaReference> {
    match value {
        Value::Array(items) => items.iter().find_map(json_ld_media),
        Value::Object(map) => {
            if let Some(url) = map.get("video").and_then(video_content_url) {
                return Some(MediaReference {
                    url,
                    kind: MediaKind::Video,
                });
            }
            if let Some(url) = map.get("image").and_then(image_url) {
                return Some(MediaReference {
                    url,
                    kind: MediaKind::Image,
                });
            }
            map.get("@graph").and_then(json_ld_media)
        }
        _ => None,
    }
}

fn video_content_url(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => non_empty_str(obj.get("contentUrl")?),
        Value::Array(items) => items.iter().find_map(video_content_url),
        _ => None,
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => non_empty_str(value),
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(obj) => non_empty_str(obj.get("url")?),
        _ => None,
    }
}

// ── Legacy page blob probes ──────────────────────────────────────────────────

fn shared_data(ctx: &ExtractionContext<'_>) -> Option<Extraction> {
    let start = SHARED_DATA_RE.find(ctx.html)?.end();
    // Parse exactly one value; whatever follows it (`;</script>...`) is ignored.
    let data = serde_json::Deserializer::from_str(&ctx.html[start..])
        .into_iter::<Value>()
        .next()?
        .ok()?;
    let media = data.pointer(SHORTCODE_MEDIA_PATH)?;
    if !media.is_object() {
        return None;
    }

    let details = post_details(media);
    let (url, kind) = if details.is_video {
        (details.video_url.clone()?, MediaKind::Video)
    } else {
        (details.display_url.clone()?, MediaKind::Image)
    };

    let mut found = Extraction::new(Strategy::SharedData, url, kind);
    found.details = Some(details);
    Some(found)
}

fn post_details(media: &Value) -> PostDetails {
    let str_at = |pointer: &str| media.pointer(pointer).and_then(non_empty_str);

    PostDetails {
        id: media.get("id").and_then(scalar_string),
        shortcode: str_at("/shortcode"),
        is_video: media
            .get("is_video")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        video_url: str_at("/video_url"),
        display_url: str_at("/display_url"),
        video_duration: media.get("video_duration").and_then(Value::as_f64),
        dimensions: media.get("dimensions").and_then(|d| {
            Some(Dimensions {
                height: d.get("height")?.as_u64()?,
                width: d.get("width")?.as_u64()?,
            })
        }),
        owner: Owner {
            username: str_at("/owner/username"),
            full_name: str_at("/owner/full_name"),
        },
        caption: str_at("/edge_media_to_caption/edges/0/node/text").unwrap_or_default(),
        timestamp: media.get("taken_at_timestamp").and_then(Value::as_i64),
        likes: media
            .pointer("/edge_media_preview_like/count")
            .and_then(Value::as_u64),
        comments: media
            .pointer("/edge_media_to_parent_comment/count")
            .and_then(Value::as_u64),
    }
}

fn video_url_field(ctx: &ExtractionContext<'_>) -> Option<Extraction> {
    VIDEO_URL_FIELD_RE
        .captures_iter(ctx.html)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| unescape_json_string(m.as_str()))
        .find(|url| !url.is_empty())
        .map(|url| Extraction::new(Strategy::VideoUrlField, url, MediaKind::Video))
}

/// Decode the body of a JSON string literal (`\u0026`, `\/`, ...).
fn unescape_json_string(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

// ── JSON helpers ─────────────────────────────────────────────────────────────

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        _ => non_empty_str(value),
    }
}
