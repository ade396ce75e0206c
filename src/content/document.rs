//! Raw content API shapes
//!
//! These mirror the JSON returned by a Prismic-style REST API and are kept
//! untransformed. Validation into domain types happens in the mapper.

use serde::{Deserialize, Serialize};

/// API root (`GET {endpoint}`), used to discover the master ref
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiRoot {
    /// The ref of the published content, if the API advertises one
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// A content release reference
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

/// One page of a document search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub results_size: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// URL of the next page; `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    #[serde(default)]
    pub results: Vec<RawDocument>,
}

fn first_page() -> u32 {
    1
}

/// A document as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    /// Custom-type fields, validated by the mapper
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_from_api_json() {
        let json = r#"{
            "page": 1,
            "results_per_page": 1,
            "results_size": 1,
            "total_results_size": 2,
            "total_pages": 2,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2&pageSize=1",
            "prev_page": null,
            "results": [{
                "id": "YF0abc",
                "uid": "como-utilizar-hooks",
                "type": "posts",
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "last_publication_date": "2021-03-15T19:25:28+0000",
                "lang": "pt-br",
                "data": {"title": "Como utilizar Hooks"}
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total_pages, 2);
        assert!(response.next_page.is_some());
        assert!(response.prev_page.is_none());
        assert_eq!(response.results.len(), 1);

        let doc = &response.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type, "posts");
        assert_eq!(doc.data["title"], "Como utilizar Hooks");
    }

    #[test]
    fn test_missing_page_defaults_to_first() {
        let response: SearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(response.page, 1);
        assert!(response.next_page.is_none());
    }

    #[test]
    fn test_master_ref() {
        let json = r#"{"refs": [
            {"id": "preview", "ref": "abc", "label": "Preview", "isMasterRef": false},
            {"id": "master", "ref": "YF0master", "label": "Master", "isMasterRef": true}
        ]}"#;
        let root: ApiRoot = serde_json::from_str(json).unwrap();
        assert_eq!(root.master_ref(), Some("YF0master"));

        let empty: ApiRoot = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.master_ref(), None);
    }
}
