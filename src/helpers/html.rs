//! HTML helper functions and rich-text rendering

use crate::content::{RichTextBlock, Span};

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render rich-text blocks to HTML
///
/// Consecutive `list-item` / `o-list-item` blocks are grouped into one
/// `<ul>` / `<ol>`. Unknown block types are skipped.
pub fn render_rich_text(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&render_block(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_block(block: &RichTextBlock) -> String {
    let text = || render_spans(block.text(), &block.spans);

    match block.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", text()),
        "preformatted" => format!("<pre>{}</pre>", text()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", text()),
        kind if kind.starts_with("heading") => match kind["heading".len()..].parse::<u8>() {
            Ok(level @ 1..=6) => format!("<h{0}>{1}</h{0}>", level, text()),
            _ => String::new(),
        },
        "image" => {
            let url = block.extra_str("url").unwrap_or("");
            let alt = block.extra_str("alt").unwrap_or("");
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                html_escape(url),
                html_escape(alt)
            )
        }
        "embed" => {
            // oEmbed markup is trusted CMS output and inserted as-is
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                html_escape(oembed_field(block, "embed_url")),
                html_escape(oembed_field(block, "type")),
                oembed_field(block, "html")
            )
        }
        other => {
            tracing::debug!("Skipping unsupported rich-text block: {}", other);
            String::new()
        }
    }
}

fn oembed_field<'a>(block: &'a RichTextBlock, key: &str) -> &'a str {
    block
        .extra
        .get("oembed")
        .and_then(|o| o.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Apply inline spans to `text`
///
/// Span offsets are character positions. The text is cut at every span
/// boundary and each segment is wrapped in the spans covering it, so
/// overlapping spans still produce well-nested markup.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len && open_tag(s).is_some())
        .collect();
    if spans.is_empty() {
        return escape_text(text);
    }
    // Outer spans first
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut bounds: Vec<usize> = vec![0, len];
    for span in &spans {
        bounds.push(span.start);
        bounds.push(span.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut html = String::new();
    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let segment: String = chars[from..to].iter().collect();
        let covering: Vec<&&Span> = spans
            .iter()
            .filter(|s| s.start <= from && s.end >= to)
            .collect();

        for span in &covering {
            html.push_str(&open_tag(span).unwrap_or_default());
        }
        html.push_str(&escape_text(&segment));
        for span in covering.iter().rev() {
            html.push_str(close_tag(span));
        }
    }

    html
}

fn open_tag(span: &Span) -> Option<String> {
    match span.kind.as_str() {
        "strong" => Some("<strong>".to_string()),
        "em" => Some("<em>".to_string()),
        "hyperlink" => {
            let data = span.data.as_ref();
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let target = data
                .and_then(|d| d.get("target"))
                .and_then(|v| v.as_str())
                .map(|t| format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t)))
                .unwrap_or_default();
            Some(format!(r#"<a href="{}"{}>"#, html_escape(url), target))
        }
        "label" => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            Some(format!(r#"<span class="{}">"#, html_escape(label)))
        }
        _ => None,
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

/// Escape text and turn line breaks into `<br />`
fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br />")
}
