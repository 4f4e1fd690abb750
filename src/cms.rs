//! CMS client: typed access to the headless CMS collections.
//!
//! Every collection lives at `GET {cms}/{path}` and answers the usual
//! `{success, data, meta}` envelope; [`CmsClient::collection`] fetches one
//! and unwraps it into raw JSON records. Interpretation of those records is
//! left to [`resolve`](crate::resolve), so a record the CMS adds fields to
//! tomorrow still round-trips through the snapshot untouched.

use crate::fetch::{CancelToken, Envelope, Request, Transport, send_json, unwrap_collection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The CMS collections the site reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Articles,
    Banners,
    Contacts,
    SocialLinks,
    Menus,
    Media,
    Partners,
    Sliders,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Articles,
        Collection::Banners,
        Collection::Contacts,
        Collection::SocialLinks,
        Collection::Menus,
        Collection::Media,
        Collection::Partners,
        Collection::Sliders,
    ];

    /// URL path segment under the CMS base.
    pub fn path(self) -> &'static str {
        match self {
            Collection::Articles => "articles",
            Collection::Banners => "banners",
            Collection::Contacts => "contacts",
            Collection::SocialLinks => "social-links",
            Collection::Menus => "menus",
            Collection::Media => "media",
            Collection::Partners => "partners",
            Collection::Sliders => "sliders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Query parameters narrowing a collection fetch.
///
/// The CMS filters server-side on these, but the resolver re-applies the
/// same predicates client-side, so a CMS that ignores a parameter only costs
/// bandwidth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    params: Vec<(String, String)>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `state=Published`.
    pub fn published() -> Self {
        Self::new().param("state", "Published")
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn menu(self, slug: &str) -> Self {
        self.param("menu", slug)
    }

    pub fn category(self, slug: &str) -> Self {
        self.param("category", slug)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

pub struct CmsClient<'a, T: Transport> {
    transport: &'a T,
    base: &'a str,
    cancel: &'a CancelToken,
}

impl<'a, T: Transport> CmsClient<'a, T> {
    pub fn new(transport: &'a T, base: &'a str, cancel: &'a CancelToken) -> Self {
        Self {
            transport,
            base,
            cancel,
        }
    }

    pub fn request(&self, collection: Collection, query: &CollectionQuery) -> Request {
        let url = format!("{}/{}", self.base.trim_end_matches('/'), collection.path());
        query
            .params()
            .iter()
            .fold(Request::get(url), |req, (k, v)| req.query(k, v.as_str()))
    }

    /// Fetch one collection as raw records.
    pub fn collection(&self, collection: Collection, query: &CollectionQuery) -> Envelope<Vec<Value>> {
        let request = self.request(collection, query);
        let result = send_json(self.transport, &request, self.cancel)
            .and_then(|(body, status)| Ok((unwrap_collection(body, status)?, status)));
        match &result {
            Ok((items, _)) => {
                tracing::debug!(%collection, count = items.len(), "collection fetched")
            }
            Err(e) => tracing::warn!(%collection, error = %e, "collection fetch failed"),
        }
        Envelope::from_result(result)
    }
}
