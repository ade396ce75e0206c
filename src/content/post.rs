//! Post models

use serde::{Deserialize, Serialize};

/// A post as shown in the list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique identifier, used in the post URL
    pub uid: String,

    /// Publication date, already formatted for display
    pub first_publication_date: String,

    pub title: String,

    pub subtitle: String,

    pub author: String,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,

    /// Publication date as returned by the API (ISO 8601)
    pub first_publication_date: Option<String>,

    pub title: String,

    pub subtitle: String,

    /// Banner image URL (empty when the post has no banner)
    pub banner_url: String,

    pub author: String,

    /// Content sections in document order
    pub content: Vec<ContentBlock>,
}

/// A titled section of a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,

    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

/// A rich-text fragment (paragraph, heading, list item, image, ...)
///
/// Blocks are passed through untouched; fields this type does not model
/// (image `url`/`alt`, `oembed`, `label`, ...) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default = "default_block_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_block_type() -> String {
    "paragraph".to_string()
}

impl RichTextBlock {
    /// A plain paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: default_block_type(),
            text: Some(text.into()),
            spans: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Text of the block, empty for blocks without text (images, embeds)
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// String field from the unmodelled part of the block
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// Inline formatting over a character range of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
