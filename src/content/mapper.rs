//! Validation of raw documents into post models

use serde::Deserialize;
use thiserror::Error;

use super::document::RawDocument;
use super::{ContentBlock, PostDetail, PostSummary, RichTextBlock};
use crate::helpers::date::{parse_publication_date, DateFormatter};

/// Why a raw document could not be turned into a post
#[derive(Debug, Error)]
pub enum MapError {
    #[error("document {id} has no uid")]
    MissingUid { id: String },

    #[error("post {uid}: missing field `{field}`")]
    MissingField { uid: String, field: &'static str },

    #[error("post {uid}: invalid publication date {value:?}: {source}")]
    InvalidDate {
        uid: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("post {uid}: malformed data: {source}")]
    Schema {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Post fields of a raw document, all optional until validated
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPostData {
    title: Option<String>,
    subtitle: Option<String>,
    author: Option<String>,
    banner: Option<RawImage>,
    content: Option<Vec<RawContentBlock>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImage {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContentBlock {
    heading: Option<String>,
    body: Option<Vec<RichTextBlock>>,
}

/// Map a document to a list-view summary, formatting its publication date
pub fn map_summary(doc: &RawDocument, dates: &DateFormatter) -> Result<PostSummary, MapError> {
    let uid = require_uid(doc)?;
    let data = parse_data(doc, &uid)?;

    let raw_date = doc
        .first_publication_date
        .as_deref()
        .ok_or_else(|| MapError::MissingField {
            uid: uid.clone(),
            field: "first_publication_date",
        })?;
    let first_publication_date =
        dates
            .format_str(raw_date)
            .map_err(|source| MapError::InvalidDate {
                uid: uid.clone(),
                value: raw_date.to_string(),
                source,
            })?;

    let title = require(data.title, &uid, "title")?;
    let author = require(data.author, &uid, "author")?;

    Ok(PostSummary {
        uid,
        first_publication_date,
        title,
        subtitle: data.subtitle.unwrap_or_default(),
        author,
    })
}

/// Map a document to a full post, passing rich text through untouched
pub fn map_detail(doc: &RawDocument) -> Result<PostDetail, MapError> {
    let uid = require_uid(doc)?;
    let data = parse_data(doc, &uid)?;

    // Unpublished previews have no date; a present one must parse
    if let Some(value) = doc.first_publication_date.as_deref() {
        parse_publication_date(value).map_err(|source| MapError::InvalidDate {
            uid: uid.clone(),
            value: value.to_string(),
            source,
        })?;
    }

    let title = require(data.title, &uid, "title")?;
    let author = require(data.author, &uid, "author")?;

    let content = data
        .content
        .unwrap_or_default()
        .into_iter()
        .map(|block| ContentBlock {
            heading: block.heading.unwrap_or_default(),
            body: block.body.unwrap_or_default(),
        })
        .collect();

    Ok(PostDetail {
        uid,
        first_publication_date: doc.first_publication_date.clone(),
        title,
        subtitle: data.subtitle.unwrap_or_default(),
        banner_url: data.banner.and_then(|b| b.url).unwrap_or_default(),
        author,
        content,
    })
}

fn require_uid(doc: &RawDocument) -> Result<String, MapError> {
    doc.uid
        .as_deref()
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MapError::MissingUid { id: doc.id.clone() })
}

fn parse_data(doc: &RawDocument, uid: &str) -> Result<RawPostData, MapError> {
    if doc.data.is_null() {
        return Ok(RawPostData::default());
    }
    RawPostData::deserialize(&doc.data).map_err(|source| MapError::Schema {
        uid: uid.to_string(),
        source,
    })
}

fn require(value: Option<String>, uid: &str, field: &'static str) -> Result<String, MapError> {
    value.ok_or_else(|| MapError::MissingField {
        uid: uid.to_string(),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter() -> DateFormatter {
        DateFormatter::new("pt-BR", "", "%d %b %Y").unwrap()
    }

    fn document(value: serde_json::Value) -> RawDocument {
        serde_json::from_value(value).unwrap()
    }

    fn post_json() -> serde_json::Value {
        json!({
            "id": "YF0abc",
            "uid": "como-utilizar-hooks",
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": {"url": "https://images.prismic.io/banner.png"},
                "content": [{
                    "heading": "H",
                    "body": [{"text": "a b"}]
                }]
            }
        })
    }

    #[test]
    fn test_map_summary() {
        let doc = document(post_json());
        let summary = map_summary(&doc, &formatter()).unwrap();
        assert_eq!(summary.uid, "como-utilizar-hooks");
        assert_eq!(summary.first_publication_date, "15 mar 2021");
        assert_eq!(summary.title, "Como utilizar Hooks");
        assert_eq!(
            summary.subtitle,
            "Pensando em sincronização em vez de ciclos de vida"
        );
        assert_eq!(summary.author, "Joseph Oliveira");
    }

    #[test]
    fn test_summary_keeps_uid_and_formats_date() {
        for uid in ["a", "post-2", "criando-um-app-cra-do-zero"] {
            let mut value = post_json();
            value["uid"] = json!(uid);
            let summary = map_summary(&document(value), &formatter()).unwrap();
            assert_eq!(summary.uid, uid);
            assert!(!summary.first_publication_date.is_empty());
        }
    }

    #[test]
    fn test_summary_rejects_bad_dates() {
        let mut value = post_json();
        value["first_publication_date"] = json!("yesterday");
        let err = map_summary(&document(value), &formatter()).unwrap_err();
        assert!(matches!(err, MapError::InvalidDate { ref value, .. } if value == "yesterday"));

        let mut value = post_json();
        value["first_publication_date"] = json!(null);
        let err = map_summary(&document(value), &formatter()).unwrap_err();
        assert!(matches!(
            err,
            MapError::MissingField {
                field: "first_publication_date",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_uid() {
        let mut value = post_json();
        value["uid"] = json!(null);
        let err = map_summary(&document(value), &formatter()).unwrap_err();
        assert!(matches!(err, MapError::MissingUid { ref id } if id == "YF0abc"));
    }

    #[test]
    fn test_missing_required_fields() {
        let mut value = post_json();
        value["data"]["title"] = json!(null);
        let err = map_detail(&document(value)).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "title", .. }));

        let mut value = post_json();
        value["data"]["subtitle"] = json!(null);
        let summary = map_summary(&document(value), &formatter()).unwrap();
        assert_eq!(summary.subtitle, "");
    }

    #[test]
    fn test_schema_error() {
        let mut value = post_json();
        value["data"]["title"] = json!(42);
        let err = map_summary(&document(value), &formatter()).unwrap_err();
        assert!(matches!(err, MapError::Schema { .. }));
    }

    #[test]
    fn test_map_detail() {
        let detail = map_detail(&document(post_json())).unwrap();
        assert_eq!(detail.uid, "como-utilizar-hooks");
        assert_eq!(
            detail.first_publication_date.as_deref(),
            Some("2021-03-15T19:25:28+0000")
        );
        assert_eq!(detail.banner_url, "https://images.prismic.io/banner.png");
        assert_eq!(detail.content.len(), 1);
        assert_eq!(detail.content[0].heading, "H");
        assert_eq!(detail.content[0].body.len(), 1);
        assert_eq!(detail.content[0].body[0].text(), "a b");
    }

    #[test]
    fn test_detail_allows_missing_date_and_banner() {
        let mut value = post_json();
        value["first_publication_date"] = json!(null);
        value["data"]["banner"] = json!({});
        value["data"]["content"] = json!([{"heading": null, "body": null}]);
        let detail = map_detail(&document(value)).unwrap();
        assert!(detail.first_publication_date.is_none());
        assert_eq!(detail.banner_url, "");
        assert_eq!(detail.content[0].heading, "");
        assert!(detail.content[0].body.is_empty());
    }

    #[test]
    fn test_detail_passes_rich_text_through() {
        let mut value = post_json();
        value["data"]["content"] = json!([{
            "heading": "Spans",
            "body": [{
                "type": "paragraph",
                "text": "bold move",
                "spans": [{"start": 0, "end": 4, "type": "strong"}]
            }, {
                "type": "image",
                "url": "https://images.prismic.io/x.png",
                "alt": null
            }]
        }]);
        let detail = map_detail(&document(value)).unwrap();
        let body = &detail.content[0].body;
        assert_eq!(body[0].spans.len(), 1);
        assert_eq!(body[0].spans[0].kind, "strong");
        assert_eq!(body[1].kind, "image");
        assert_eq!(body[1].extra_str("url"), Some("https://images.prismic.io/x.png"));
    }
}
