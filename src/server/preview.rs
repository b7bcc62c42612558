//! Preview module - generates the OpenGraph / Twitter-card page shown by chat clients.

use crate::post::PostRecord;

/// Player dimensions advertised for proxied videos.
pub const VIDEO_WIDTH: u32 = 320;
pub const VIDEO_HEIGHT: u32 = 320;

const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Escape HTML special characters to prevent XSS attacks.
pub(crate) fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// A video as it should appear in the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewVideo {
    /// Local `/media_download` URL
    pub url: String,

    /// Poster image, taken from the post's first thumbnail
    pub thumbnail_url: Option<String>,
}

/// Everything the preview page needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPage {
    /// Canonical URL of the post on its origin site
    pub post_url: String,

    pub username: String,

    pub description: Option<String>,

    /// Single photo URL, or the mosaic URL when the post has several images
    pub image: Option<String>,

    pub video: Option<PreviewVideo>,
}

impl PreviewPage {
    /// Assemble a page from a validated record.
    ///
    /// `video_urls` are the already-proxied video URLs, in post order.
    pub fn from_record(
        record: &PostRecord,
        username: &str,
        post_url: &str,
        mosaic_url: &str,
        video_urls: &[String],
    ) -> Self {
        let image = record.photos().next().map(|first_photo| {
            if record.images().count() > 1 {
                mosaic_url.to_string()
            } else {
                first_photo.url.clone()
            }
        });

        let video = video_urls.first().map(|url| PreviewVideo {
            url: url.clone(),
            thumbnail_url: record
                .media
                .iter()
                .find(|m| m.kind == crate::post::MediaKind::Thumbnail)
                .map(|m| m.url.clone()),
        });

        Self {
            post_url: post_url.to_string(),
            username: username.to_string(),
            description: record.summary().map(str::to_string),
            image,
            video,
        }
    }

    /// Render the page. Video cards take precedence over image cards.
    pub fn render(&self) -> String {
        let mut meta = Vec::new();

        if let Some(video) = &self.video {
            meta.extend(video_meta(video));
        } else if let Some(image) = &self.image {
            meta.extend(image_meta(image));
        }
        meta.extend(text_meta(self));

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n{}\n</head>\n<body></body>\n</html>\n",
            meta.join("\n")
        )
    }
}

fn text_meta(page: &PreviewPage) -> Vec<String> {
    vec![
        format!(
            r#"<meta property="og:url" content="{}"/>"#,
            html_escape(&page.post_url)
        ),
        format!(
            r#"<meta property="og:title" content="Thread from {}"/>"#,
            html_escape(&page.username)
        ),
        format!(
            r#"<meta name="twitter:description" content="{}">"#,
            html_escape(page.description.as_deref().unwrap_or_default())
        ),
    ]
}

fn image_meta(url: &str) -> Vec<String> {
    let url = html_escape(url);
    vec![
        r#"<meta name="twitter:card" content="summary_large_image">"#.to_string(),
        format!(r#"<meta property="twitter:image" content="{url}">"#),
        format!(r#"<meta property="og:image" content="{url}">"#),
    ]
}

fn video_meta(video: &PreviewVideo) -> Vec<String> {
    let url = html_escape(&video.url);
    let mut meta = vec![
        r#"<meta name="twitter:card" content="player">"#.to_string(),
        format!(r#"<meta property="twitter:player" content="{url}">"#),
        format!(r#"<meta property="twitter:player:stream" content="{url}"/>"#),
        format!(
            r#"<meta property="twitter:player:stream:content_type" content="{VIDEO_CONTENT_TYPE}"/>"#
        ),
        format!(r#"<meta property="twitter:player:width" content="{VIDEO_WIDTH}">"#),
        format!(r#"<meta property="twitter:player:height" content="{VIDEO_HEIGHT}">"#),
        r#"<meta property="og:type" content="video.other">"#.to_string(),
        format!(r#"<meta property="og:video:url" content="{url}">"#),
        format!(r#"<meta property="og:video:secure_url" content="{url}">"#),
        format!(r#"<meta property="og:video:type" content="{VIDEO_CONTENT_TYPE}">"#),
        format!(r#"<meta property="og:video:width" content="{VIDEO_WIDTH}">"#),
        format!(r#"<meta property="og:video:height" content="{VIDEO_HEIGHT}">"#),
    ];

    if let Some(thumbnail) = &video.thumbnail_url {
        meta.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            html_escape(thumbnail)
        ));
    }

    meta
}
