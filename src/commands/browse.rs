//! Browse posts page by page in the terminal

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use super::list::write_summaries;
use crate::config::SiteConfig;
use crate::content::ContentApi;
use crate::helpers::DateFormatter;
use crate::pagination::{LoadOutcome, PostFeed};
use crate::Blog;

/// Show the first page and load one more page per Enter, `q` to stop
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    browse(&client, &blog.config, &mut input, &mut stdout).await
}

pub async fn browse<C, R, W>(
    client: &C,
    config: &SiteConfig,
    input: &mut Lines<R>,
    out: &mut W,
) -> Result<()>
where
    C: ContentApi + ?Sized,
    R: AsyncBufRead + Unpin,
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
    write_summaries(out, feed.items())?;

    while feed.has_more() {
        write!(out, "Load more posts? [Enter = yes, q = quit] ")?;
        out.flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        match feed.load_more().await? {
            LoadOutcome::Loaded { added, .. } => write_summaries(out, &feed.items()[added])?,
            LoadOutcome::Exhausted | LoadOutcome::Busy => break,
        }
    }

    if !feed.has_more() {
        writeln!(out, "No more posts.")?;
    }
    writeln!(
        out,
        "{} posts loaded (page {}).",
        feed.items().len(),
        feed.state().page()
    )?;
    Ok(())
}
