//! Content module - fetches posts from the content API and maps them

pub mod client;
pub mod document;
pub mod mapper;
mod post;
pub mod reading_time;

pub use client::{ClientError, ContentApi, PrismicClient, QueryOptions};
pub use document::{RawDocument, SearchResponse};
pub use mapper::{map_detail, map_summary, MapError};
pub use post::{ContentBlock, PostDetail, PostSummary, RichTextBlock, Span};
