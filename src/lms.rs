//! Learning platform (NULP) client: course search and discussion topics.
//!
//! ## Content search
//!
//! `POST {nulp}/api/content/v1/search` takes
//! `{"request": {"filters", "sort_by", "facets", "limit", "query"?}}` and
//! answers `{"responseCode": "OK", "result": {"content", "count", "facets"}}`.
//! Any other `responseCode` is an invalid response, whatever the HTTP status.
//!
//! ## Discussion forum
//!
//! Popular topics come from `GET {nulp}/discussion-forum/api/popular`, topics
//! of one domain from `GET {nulp}/discussion-forum/api/category/{domain}`.
//! A domain with no forum category answers 404; that is reported as an empty
//! success, not an error.

use crate::fetch::{
    CancelToken, Envelope, FetchError, Request, Transport, invalid, send_json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

pub const SEARCH_PATH: &str = "/api/content/v1/search";
pub const POPULAR_TOPICS_PATH: &str = "/discussion-forum/api/popular";
pub const DOMAIN_TOPICS_PATH: &str = "/discussion-forum/api/category";

// ============================================================================
// Content search
// ============================================================================

/// Body of a content search, built fluently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub filters: Map<String, Value>,
    pub sort_by: Map<String, Value>,
    pub facets: Vec<String>,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl SearchRequest {
    /// Live content of the given primary categories, newest first.
    pub fn courses(categories: &[String], limit: usize) -> Self {
        Self {
            filters: Map::new(),
            sort_by: Map::new(),
            facets: Vec::new(),
            limit,
            query: None,
        }
        .filter("status", json!(["Live"]))
        .filter("primaryCategory", json!(categories))
        .sort("lastUpdatedOn", "desc")
        .facet("se_boards")
    }

    pub fn filter(mut self, key: &str, value: Value) -> Self {
        self.filters.insert(key.to_string(), value);
        self
    }

    pub fn sort(mut self, field: &str, direction: &str) -> Self {
        self.sort_by
            .insert(field.to_string(), Value::String(direction.to_string()));
        self
    }

    pub fn facet(mut self, facet: &str) -> Self {
        self.facets.push(facet.to_string());
        self
    }

    pub fn query(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    /// The wire body: the request wrapped in `{"request": ...}`.
    pub fn to_body(&self) -> Value {
        json!({ "request": self })
    }
}

/// One course (or other content) returned by search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, deserialize_with = "lenient_string")]
    pub identifier: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub app_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub primary_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub organisation: Vec<String>,
}

impl Course {
    pub fn first_organisation(&self) -> Option<&str> {
        self.organisation.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub content: Vec<Course>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub facets: Vec<Value>,
}

/// Validate a search response body and extract its result.
pub fn parse_search_body(body: Value, status: u16) -> Result<SearchResult, FetchError> {
    let code = body.get("responseCode").and_then(Value::as_str);
    if code != Some("OK") {
        return Err(invalid(
            status,
            &format!("responseCode {}", code.unwrap_or("missing")),
        ));
    }
    let Some(result) = body.get("result") else {
        return Err(invalid(status, "missing result"));
    };
    // Records that are not objects are dropped rather than failing the page.
    let content: Vec<Course> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|v| v.is_object())
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    let count = result
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    let facets = result
        .get("facets")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(SearchResult {
        content,
        count,
        facets,
    })
}

// ============================================================================
// Discussion forum
// ============================================================================

/// One forum topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: String,
    #[serde(default, alias = "postcount", deserialize_with = "lenient_count")]
    pub post_count: u64,
    #[serde(default, alias = "viewcount", deserialize_with = "lenient_count")]
    pub view_count: u64,
}

/// Topic list from a forum body: a bare array, `{topics: [...]}`, or
/// `{data: [...]}`.
pub fn parse_topics(body: Value, status: u16) -> Result<Vec<Topic>, FetchError> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("topics").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(invalid(status, "topics is not an array")),
        },
        _ => return Err(invalid(status, "expected a topic list")),
    };
    Ok(list
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

// ============================================================================
// Client
// ============================================================================

pub struct LmsClient<'a, T: Transport> {
    transport: &'a T,
    base: &'a str,
    cancel: &'a CancelToken,
}

impl<'a, T: Transport> LmsClient<'a, T> {
    pub fn new(transport: &'a T, base: &'a str, cancel: &'a CancelToken) -> Self {
        Self {
            transport,
            base,
            cancel,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base.trim_end_matches('/'))
    }

    pub fn search(&self, request: &SearchRequest) -> Envelope<SearchResult> {
        let req = Request::post(self.url(SEARCH_PATH), request.to_body());
        let result = send_json(self.transport, &req, self.cancel)
            .and_then(|(body, status)| Ok((parse_search_body(body, status)?, status)));
        if let Err(e) = &result {
            tracing::warn!(error = %e, "content search failed");
        }
        Envelope::from_result(result)
    }

    pub fn popular_topics(&self) -> Envelope<Vec<Topic>> {
        let req = Request::get(self.url(POPULAR_TOPICS_PATH));
        let result = send_json(self.transport, &req, self.cancel)
            .and_then(|(body, status)| Ok((parse_topics(body, status)?, status)));
        if let Err(e) = &result {
            tracing::warn!(error = %e, "popular topics fetch failed");
        }
        Envelope::from_result(result)
    }

    /// `path` with one extra percent-encoded segment appended.
    fn segment_url(&self, path: &str, segment: &str) -> Result<String, FetchError> {
        let mut url = reqwest::Url::parse(&self.url(path))
            .map_err(|e| FetchError::Transport(format!("invalid URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport("URL cannot take a path segment".to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url.to_string())
    }

    /// Topics of one domain. Upstream 404 is an empty success.
    pub fn topics_by_domain(&self, domain: &str) -> Envelope<Vec<Topic>> {
        let sent = self
            .segment_url(DOMAIN_TOPICS_PATH, domain)
            .and_then(|url| send_json(self.transport, &Request::get(url), self.cancel));
        let result = match sent {
            Err(FetchError::Upstream { status: 404, .. }) => {
                tracing::debug!(domain, "no forum category for domain");
                Ok((Vec::new(), 200))
            }
            other => other.and_then(|(body, status)| Ok((parse_topics(body, status)?, status))),
        };
        if let Err(e) = &result {
            tracing::warn!(domain, error = %e, "domain topics fetch failed");
        }
        Envelope::from_result(result)
    }
}

// ============================================================================
// Lenient field deserializers
// ============================================================================

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// A string list, or a single string taken as a one-element list.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}
