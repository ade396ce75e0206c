//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Fetch all posts and generate the static site
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let client = blog.client()?;
    let generator = Generator::new(blog)?;

    tracing::info!(
        "Fetching {} documents from {}",
        blog.config.prismic.document_type,
        blog.config.prismic.endpoint
    );
    let stats = generator.generate(&client).await?;

    if stats.skipped > 0 {
        tracing::warn!("{} posts could not be generated", stats.skipped);
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts and {} list chunks in {:.2}s",
        stats.posts,
        stats.chunks,
        duration.as_secs_f64()
    );

    Ok(())
}
