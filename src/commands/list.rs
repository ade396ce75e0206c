//! List posts

use anyhow::Result;
use std::io::Write;

use crate::config::SiteConfig;
use crate::content::{ContentApi, PostSummary};
use crate::helpers::DateFormatter;
use crate::pagination::PostFeed;
use crate::Blog;

/// List every post, following all pages
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let mut stdout = std::io::stdout();
    list_posts(&client, &blog.config, &mut stdout).await
}

pub async fn list_posts<C, W>(client: &C, config: &SiteConfig, out: &mut W) -> Result<()>
where
    C: ContentApi + ?Sized,
    W: Write,
{
    let dates = DateFormatter::from_config(config)?;
    let mut feed = PostFeed::seed(
        client,
        &dates,
        &config.prismic.document_type,
        config.prismic.page_size,
    )
    .await?;
    let pages = feed.load_all().await? + 1;

    writeln!(out, "Posts ({}, {} pages):", feed.items().len(), pages)?;
    write_summaries(out, feed.items())?;
    Ok(())
}

/// One line per post
pub(crate) fn write_summaries<W: Write>(out: &mut W, posts: &[PostSummary]) -> std::io::Result<()> {
    for post in posts {
        writeln!(
            out,
            "  {} - {} by {} [{}]",
            post.first_publication_date, post.title, post.author, post.uid
        )?;
    }
    Ok(())
}
