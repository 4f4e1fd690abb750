//! Content pages: one page per live menu, at `/{menu-slug}/`.
//!
//! Each menu's page shows its banner and its articles. When the CMS has
//! nothing for a menu (no visible banner, no visible articles, or the fetch
//! failed) the page still exists and shows a "content being prepared"
//! placeholder, so navigation never leads to a dead link.

use crate::fetch::Envelope;
use crate::resolve::{ResolvedList, VisibilityRules, resolve_values};
use crate::sanitize::{SanitizedHtml, sanitize};
use crate::sections::NavLink;
use crate::select::select;
use crate::snapshot::Snapshot;
use crate::types::ContentItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub description: SanitizedHtml,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub body: SanitizedHtml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageBody {
    Content {
        banner: Option<Banner>,
        articles: Vec<Article>,
    },
    /// Nothing published for this menu yet.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub slug: String,
    pub title: String,
    pub body: PageBody,
}

impl ContentPage {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, PageBody::Placeholder)
    }

    /// Output path relative to the site root.
    pub fn path(&self) -> String {
        format!("{}/index.html", self.slug)
    }
}

fn visible(envelope: Option<&Envelope<Vec<Value>>>, now: DateTime<Utc>) -> ResolvedList {
    match envelope {
        Some(Envelope {
            success: true,
            data: Some(values),
            ..
        }) => resolve_values(values, &VisibilityRules::published(), now),
        _ => ResolvedList::default(),
    }
}

/// The menu's banner: the one keyed by the menu slug if any, else the
/// first visible one.
fn pick_banner(banners: &[ContentItem], slug: &str) -> Option<Banner> {
    let item = select(banners, slug).or_else(|| banners.first())?;
    Some(Banner {
        title: item.label().to_string(),
        description: sanitize(item.text(&["description", "content"]).unwrap_or_default()),
        image: item
            .text(&["image", "image_url", "imageUrl", "banner_image"])
            .map(str::to_string),
    })
}

fn to_article(item: &ContentItem) -> Option<Article> {
    let body = sanitize(item.text(&["content", "body", "description"])?);
    if body.is_blank() {
        return None;
    }
    Some(Article {
        slug: item.slug.clone(),
        title: item.label().to_string(),
        body,
    })
}

/// Build the page for one menu.
pub fn build_page(snapshot: &Snapshot, link: &NavLink, now: DateTime<Utc>) -> ContentPage {
    let banners = visible(snapshot.menu_banners.get(&link.slug), now);
    let articles: Vec<Article> = visible(snapshot.menu_articles.get(&link.slug), now)
        .iter()
        .filter_map(to_article)
        .collect();
    let banner = pick_banner(&banners, &link.slug);

    let body = if banner.is_none() && articles.is_empty() {
        tracing::debug!(menu = %link.slug, "no content; rendering placeholder");
        PageBody::Placeholder
    } else {
        PageBody::Content { banner, articles }
    };
    ContentPage {
        slug: link.slug.clone(),
        title: link.title.clone(),
        body,
    }
}

pub fn build_pages(snapshot: &Snapshot, nav: &[NavLink], now: DateTime<Utc>) -> Vec<ContentPage> {
    nav.iter().map(|link| build_page(snapshot, link, now)).collect()
}

/// Whether a menu slug can name a directory under the output root: one
/// path segment of ASCII letters, digits, `.`, `_` or `-`, and not `.` or `..`.
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
