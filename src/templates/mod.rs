//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. HTML autoescaping stays on because
//! titles and authors come straight from the content API; rich text goes
//! through the `rich_text` filter and is marked safe explicitly.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{reading_time, ContentBlock, PostDetail, PostSummary, RichTextBlock};
use crate::helpers::date::{date_xml, parse_publication_date, DateFormatter};
use crate::helpers::{full_url_for, post_url, render_rich_text, url_for};

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
        ])?;

        tera.register_filter("rich_text", rich_text_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: render an array of rich-text blocks to HTML
fn rich_text_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let blocks: Vec<RichTextBlock> = serde_json::from_value(value.clone())
        .map_err(|e| tera::Error::msg(format!("rich_text: {}", e)))?;
    Ok(tera::Value::String(render_rich_text(&blocks)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub url: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: url_for(config, "/"),
            url: config.url.clone(),
        }
    }
}

/// A list entry, as rendered in `index.html` and served in feed chunks
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub summary: PostSummary,
    pub href: String,
}

impl PostCard {
    pub fn new(config: &SiteConfig, summary: &PostSummary) -> Self {
        Self {
            href: post_url(config, &summary.uid),
            summary: summary.clone(),
        }
    }
}

/// One `feed/{n}.json` file
#[derive(Debug, Clone, Serialize)]
pub struct FeedChunk {
    pub page: usize,
    pub results: Vec<PostCard>,
    pub next_page: Option<String>,
}

/// Everything `post.html` shows
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub banner_url: String,
    pub author: String,
    /// Formatted publication date, empty when unpublished
    pub date: String,
    /// Machine-readable publication date for `<time datetime>`
    pub datetime: String,
    pub reading_time: usize,
    pub permalink: String,
    pub content: Vec<ContentBlock>,
}

impl PostView {
    pub fn new(config: &SiteConfig, dates: &DateFormatter, post: &PostDetail) -> Self {
        // Dates were validated by the mapper
        let published = post
            .first_publication_date
            .as_deref()
            .and_then(|d| parse_publication_date(d).ok());

        Self {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: published.map(|d| dates.format(&d)).unwrap_or_default(),
            datetime: published.map(|d| date_xml(&d)).unwrap_or_default(),
            reading_time: reading_time::reading_time(&post.content, config.words_per_minute),
            permalink: full_url_for(config, &post_url(config, &post.uid)),
            content: post.content.clone(),
        }
    }
}
