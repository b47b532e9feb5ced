use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Content type used when the media host does not send one.
    pub fn default_content_type(self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Image => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub url: String,
    pub kind: MediaKind,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Dimensions {
    pub height: u64,
    pub width: u64,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct Owner {
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// Post metadata exposed by the legacy `_sharedData` page blob.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct PostDetails {
    pub id: Option<String>,
    pub shortcode: Option<String>,
    pub is_video: bool,
    pub video_url: Option<String>,
    pub display_url: Option<String>,
    pub video_duration: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub owner: Owner,
    pub caption: String,
    pub timestamp: Option<i64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub success: bool,
    pub media_url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PostDetails>,
}

#[derive(Debug, Serialize)]
pub struct DownloadData {
    pub media_url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub shortcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PostDetails>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub data: DownloadData,
}

#[derive(Debug, Serialize)]
pub struct ReelResponse {
    pub success: bool,
    pub video_url: String,
}
