//! Generator module - writes the static site using the built-in templates

use anyhow::{Context as _, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tera::Context;

use crate::content::{map_detail, ContentApi, PostDetail, PostSummary};
use crate::helpers::{feed_chunk_url, is_safe_uid, DateFormatter};
use crate::pagination::{LoadOutcome, PostFeed};
use crate::templates::{FeedChunk, PostCard, PostView, SiteData, TemplateRenderer};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Posts in the list, in list order (repeats included)
    pub listed: usize,
    /// Post pages written
    pub posts: usize,
    /// `feed/{n}.json` chunks written
    pub chunks: usize,
    /// Listed posts whose page could not be generated
    pub skipped: usize,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    dates: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let dates = DateFormatter::from_config(&blog.config)?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            dates,
        })
    }

    /// Generate the entire site
    ///
    /// The first page of posts becomes `index.html`; every further page is
    /// loaded through the feed and written as a JSON chunk for the
    /// "load more" button. Each listed post then gets its own page.
    pub async fn generate<C: ContentApi + ?Sized>(&self, client: &C) -> Result<GenerateStats> {
        let config = &self.blog.config;
        fs::create_dir_all(&self.blog.public_dir)?;
        self.remove_stale_output()?;

        let mut feed = PostFeed::seed(
            client,
            &self.dates,
            &config.prismic.document_type,
            config.prismic.page_size,
        )
        .await
        .context("failed to fetch the first page of posts")?;

        let next = feed.has_more().then(|| feed_chunk_url(config, 2));
        self.write_index(feed.items(), next)?;

        let mut stats = GenerateStats::default();
        let mut chunk = 1;
        while let LoadOutcome::Loaded { page, added } = feed
            .load_more()
            .await
            .with_context(|| format!("failed to load page {} of posts", chunk + 1))?
        {
            chunk += 1;
            tracing::debug!("Page {} from the API becomes chunk {}", page, chunk);
            let next = feed.has_more().then(|| feed_chunk_url(config, chunk + 1));
            self.write_feed_chunk(chunk, &feed.items()[added], next)?;
            stats.chunks += 1;
        }

        stats.listed = feed.items().len();
        tracing::info!("Fetched {} posts in {} pages", stats.listed, chunk);

        let mut seen = HashSet::new();
        for summary in feed.items() {
            if !seen.insert(summary.uid.as_str()) {
                continue;
            }
            if !is_safe_uid(&summary.uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", summary.uid);
                stats.skipped += 1;
                continue;
            }
            match self.generate_post(client, &summary.uid).await? {
                Some(_) => stats.posts += 1,
                None => {
                    tracing::warn!("Post {} disappeared while generating", summary.uid);
                    stats.skipped += 1;
                }
            }
        }

        self.write_not_found()?;

        Ok(stats)
    }

    /// Fetch one post by uid and write its page
    ///
    /// Returns `None` when the content API does not know the uid.
    pub async fn generate_post<C: ContentApi + ?Sized>(
        &self,
        client: &C,
        uid: &str,
    ) -> Result<Option<PathBuf>> {
        let config = &self.blog.config;
        let Some(doc) = client
            .get_by_uid(&config.prismic.document_type, uid)
            .await
            .with_context(|| format!("failed to fetch post {}", uid))?
        else {
            return Ok(None);
        };

        let detail = map_detail(&doc)?;
        self.write_post(&detail).map(Some)
    }

    /// Output file of a post page
    pub fn post_output_path(&self, uid: &str) -> PathBuf {
        self.blog
            .public_dir
            .join("post")
            .join(uid)
            .join("index.html")
    }

    /// Output file of the not-found page
    pub fn not_found_path(&self) -> PathBuf {
        self.blog.public_dir.join("404.html")
    }

    /// Drop chunks and post pages left over from an earlier build
    fn remove_stale_output(&self) -> Result<()> {
        for dir in ["feed", "post"] {
            let path = self.blog.public_dir.join(dir);
            if path.exists() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove {:?}", path))?;
                tracing::debug!("Removed stale output: {:?}", path);
            }
        }
        Ok(())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&self.blog.config));
        context.insert("generator_version", env!("CARGO_PKG_VERSION"));
        context
    }

    fn write_index(&self, posts: &[PostSummary], next_page: Option<String>) -> Result<()> {
        let config = &self.blog.config;
        let cards: Vec<PostCard> = posts.iter().map(|p| PostCard::new(config, p)).collect();

        let mut context = self.base_context();
        context.insert("posts", &cards);
        context.insert("next_page", &next_page);

        let html = self.renderer.render("index.html", &context)?;
        let output_path = self.blog.public_dir.join("index.html");
        write_file(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    fn write_feed_chunk(
        &self,
        n: usize,
        posts: &[PostSummary],
        next_page: Option<String>,
    ) -> Result<()> {
        let config = &self.blog.config;
        let chunk = FeedChunk {
            page: n,
            results: posts.iter().map(|p| PostCard::new(config, p)).collect(),
            next_page,
        };

        let output_path = self.blog.public_dir.join(format!("feed/{}.json", n));
        write_file(&output_path, serde_json::to_string_pretty(&chunk)?)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Render and write a post page
    pub fn write_post(&self, post: &PostDetail) -> Result<PathBuf> {
        let view = PostView::new(&self.blog.config, &self.dates, post);

        let mut context = self.base_context();
        context.insert("post", &view);

        let html = self.renderer.render("post.html", &context)?;
        let output_path = self.post_output_path(&post.uid);
        write_file(&output_path, html)?;
        tracing::debug!("Generated post: {:?}", output_path);
        Ok(output_path)
    }

    fn write_not_found(&self) -> Result<()> {
        let html = self.renderer.render("404.html", &self.base_context())?;
        write_file(&self.not_found_path(), html)
    }
}

/// Write through a temp file in the same directory, then rename into place
fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("Failed to create dir {:?}", parent))?;

    let mut file = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    file.write_all(contents.as_ref())
        .with_context(|| format!("Failed to write {:?}", path))?;
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
