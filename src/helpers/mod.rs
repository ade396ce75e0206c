//! Helper functions for rendering
//!
//! Date formatting, HTML escaping and rich-text rendering, and URL
//! generation shared by the generator, the templates and the server.

pub mod date;
pub mod html;
pub mod url;

pub use date::DateFormatter;
pub use html::{html_escape, render_rich_text};
pub use url::{feed_chunk_url, full_url_for, is_safe_uid, post_url, url_for};
