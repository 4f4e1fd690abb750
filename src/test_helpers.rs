//! Shared test utilities for the nulp-site test suite.
//!
//! Provides a fluent [`ContentItem`] builder, bulk extractors, and snapshot
//! fixtures that work with fetch- and resolve-stage data structures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let items = vec![
//!     item("vision").published().order(2).build(),
//!     item("mission").published().order(1).category("about").build(),
//! ];
//! let resolved = resolve(items, &VisibilityRules::published(), now);
//! assert_eq!(slugs(&resolved), vec!["mission", "vision"]);
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use crate::config::{Endpoints, Environment};
use crate::fetch::Envelope;
use crate::snapshot::Snapshot;
use crate::types::{Category, ContentItem};

// =========================================================================
// ContentItem builder
// =========================================================================

/// Start building an item with the given slug and no state.
pub fn item(slug: &str) -> ItemBuilder {
    ItemBuilder(ContentItem {
        id: slug.to_string(),
        slug: slug.to_string(),
        ..Default::default()
    })
}

pub struct ItemBuilder(ContentItem);

impl ItemBuilder {
    pub fn state(mut self, state: &str) -> Self {
        self.0.state = state.to_string();
        self
    }

    pub fn published(self) -> Self {
        self.state("Published")
    }

    pub fn active(mut self, active: Option<bool>) -> Self {
        self.0.active = active;
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.0.display_order = order;
        self
    }

    pub fn category(mut self, slug: &str) -> Self {
        self.0.category = Some(Category {
            slug: slug.to_string(),
            name: slug.to_string(),
        });
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.0.name = Some(name.to_string());
        self
    }

    pub fn starts(mut self, at: DateTime<Utc>) -> Self {
        self.0.start_publish = Some(at);
        self
    }

    pub fn ends(mut self, at: DateTime<Utc>) -> Self {
        self.0.end_publish = Some(at);
        self
    }

    pub fn build(self) -> ContentItem {
        self.0
    }
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Slugs in list order.
pub fn slugs(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.slug.as_str()).collect()
}

/// A fixed build time: 2026-05-01 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

// =========================================================================
// Snapshot fixtures
// =========================================================================

pub fn staging_endpoints() -> Endpoints {
    Endpoints {
        environment: Environment::Staging,
        cms: "https://cms.test/api/v1".to_string(),
        nulp: "https://nulp.test".to_string(),
    }
}

/// An empty snapshot: every collection fetched successfully with no records.
pub fn empty_snapshot() -> Snapshot {
    Snapshot::new(staging_endpoints(), fixed_now())
}

/// A snapshot with one representative published record per collection.
pub fn sample_snapshot() -> Snapshot {
    let mut snapshot = empty_snapshot();
    let ok = |values: Vec<Value>| Envelope::ok(values, 200);

    snapshot.menus = ok(vec![
        json!({"id": 1, "slug": "about-us", "title": "About Us", "state": "Published", "displayOrder": 1}),
        json!({"id": 2, "slug": "resources", "title": "Resources", "state": "Published", "displayOrder": 2}),
        json!({"id": 3, "slug": "old-menu", "title": "Old", "state": "Draft"}),
    ]);
    snapshot.sliders = ok(vec![json!({
        "id": 10, "slug": "welcome", "state": "Published",
        "title": "Welcome to NULP",
        "description": "<p style=\"background:#000\">Learn together</p>",
        "image": "https://cdn.test/hero.png",
        "link": "/about-us"
    })]);
    snapshot.articles = ok(vec![json!({
        "id": 20, "slug": "our-mission", "name": "our-mission", "state": "Published",
        "content": "<div><h3>Mission</h3><p>Build capacity</p></div><div><h3>Vision</h3><p>Every city</p></div>"
    })]);
    snapshot.contacts = ok(vec![
        json!({
            "id": 30, "slug": "head-office", "state": "Published",
            "category": {"slug": "about-page-contact-us", "name": "Contact Us"},
            "title": "Head Office", "address": "New Delhi", "email": "info@nulp.test"
        }),
        json!({
            "id": 31, "slug": "regional-office", "state": "Draft",
            "category": {"slug": "about-page-contact-us", "name": "Contact Us"}
        }),
    ]);
    snapshot.partners = ok(vec![json!({
        "id": 40, "slug": "partner-a", "state": "Published", "name": "Partner A",
        "logo": "https://cdn.test/a.png", "link": "https://a.test"
    })]);
    snapshot.social_links = ok(vec![json!({
        "id": 50, "slug": "twitter", "state": "Published", "name": "Twitter",
        "link": "https://twitter.com/nulp"
    })]);
    snapshot.menu_articles.insert(
        "about-us".to_string(),
        ok(vec![json!({
            "id": 60, "slug": "about-nulp", "state": "Published", "title": "About NULP",
            "content": "<p style=\"background-color:#eee;color:#111\">National platform</p>"
        })]),
    );
    snapshot.menu_banners.insert("about-us".to_string(), ok(vec![]));
    snapshot.menu_articles.insert("resources".to_string(), ok(vec![]));
    snapshot.menu_banners.insert("resources".to_string(), ok(vec![]));
    snapshot
}
