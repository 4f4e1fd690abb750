//! Visibility resolution: which CMS records a section shows, and in what order.
//!
//! Every section of the site runs its raw records through the same pipeline,
//! parameterized by a [`VisibilityRules`] value:
//!
//! 1. **State**: compared case-insensitively. Normally only `published` is
//!    visible; [`StatePolicy::PublishedOrBlank`] also admits records with no
//!    state at all (legacy records created before the field existed).
//! 2. **Active flag**: an explicit `isActive: false` hides the record; a
//!    missing flag means active.
//! 3. **Category**: when configured, `category.slug` must equal the rule's
//!    slug. Most sections compare exactly, a few ignore case; the choice is
//!    per rule set ([`CaseSensitivity`]) rather than global.
//! 4. **Publish window**: `startPublish <= now <= endPublish`, each bound
//!    optional.
//! 5. **Order**: stable ascending sort by `displayOrder` (missing = 0), so
//!    ties keep the order the CMS returned them in.
//!
//! Resolution is pure: the same records, rules and `now` always produce the
//! same list. An empty or fully filtered input is an empty list, not an error.

use crate::types::ContentItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which `state` values are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatePolicy {
    /// Only `published` (any case).
    #[default]
    PublishedOnly,
    /// `published` or an empty/missing state.
    PublishedOrBlank,
    /// No state check.
    Any,
}

impl StatePolicy {
    pub fn admits(self, state: &str) -> bool {
        let state = state.trim();
        match self {
            StatePolicy::PublishedOnly => state.eq_ignore_ascii_case("published"),
            StatePolicy::PublishedOrBlank => {
                state.is_empty() || state.eq_ignore_ascii_case("published")
            }
            StatePolicy::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Exact,
    IgnoreCase,
}

impl CaseSensitivity {
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Exact => a == b,
            CaseSensitivity::IgnoreCase => a.eq_ignore_ascii_case(b),
        }
    }
}

/// Keep only records of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub slug: String,
    pub case: CaseSensitivity,
}

/// The predicates applied to one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRules {
    pub state: StatePolicy,
    pub require_active: bool,
    pub category: Option<CategoryFilter>,
    pub publish_window: bool,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self {
            state: StatePolicy::PublishedOnly,
            require_active: true,
            category: None,
            publish_window: true,
        }
    }
}

impl VisibilityRules {
    /// Published, active, inside the publish window.
    pub fn published() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: StatePolicy) -> Self {
        self.state = state;
        self
    }

    /// Restrict to a category slug, compared exactly.
    pub fn in_category(mut self, slug: impl Into<String>) -> Self {
        self.category = Some(CategoryFilter {
            slug: slug.into(),
            case: CaseSensitivity::Exact,
        });
        self
    }

    /// Restrict to a category slug, ignoring case.
    pub fn in_category_ignore_case(mut self, slug: impl Into<String>) -> Self {
        self.category = Some(CategoryFilter {
            slug: slug.into(),
            case: CaseSensitivity::IgnoreCase,
        });
        self
    }

    pub fn without_publish_window(mut self) -> Self {
        self.publish_window = false;
        self
    }

    /// Whether a single record passes every predicate at `now`.
    pub fn admits(&self, item: &ContentItem, now: DateTime<Utc>) -> bool {
        if !self.state.admits(&item.state) {
            return false;
        }
        if self.require_active && !item.is_active() {
            return false;
        }
        if let Some(filter) = &self.category {
            let matches = item
                .category_slug()
                .is_some_and(|slug| filter.case.matches(slug, &filter.slug));
            if !matches {
                return false;
            }
        }
        if self.publish_window && !within_window(item, now) {
            return false;
        }
        true
    }
}

/// `startPublish <= now <= endPublish`, each bound optional.
pub fn within_window(item: &ContentItem, now: DateTime<Utc>) -> bool {
    let started = item.start_publish.is_none_or(|start| now >= start);
    let not_ended = item.end_publish.is_none_or(|end| now <= end);
    started && not_ended
}

/// Records that passed a rule set, sorted by display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedList(Vec<ContentItem>);

impl ResolvedList {
    pub fn items(&self) -> &[ContentItem] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ContentItem> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentItem> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&ContentItem> {
        self.0.first()
    }
}

impl std::ops::Deref for ResolvedList {
    type Target = [ContentItem];
    fn deref(&self) -> &[ContentItem] {
        &self.0
    }
}

impl IntoIterator for ResolvedList {
    type Item = ContentItem;
    type IntoIter = std::vec::IntoIter<ContentItem>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedList {
    type Item = &'a ContentItem;
    type IntoIter = std::slice::Iter<'a, ContentItem>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Filter and sort typed records.
pub fn resolve(
    items: impl IntoIterator<Item = ContentItem>,
    rules: &VisibilityRules,
    now: DateTime<Utc>,
) -> ResolvedList {
    let mut visible: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| rules.admits(item, now))
        .collect();
    // sort_by_key is stable: equal display orders keep fetch order.
    visible.sort_by_key(|item| item.display_order);
    ResolvedList(visible)
}

/// Parse raw JSON records, then [`resolve`] them.
///
/// Records that cannot be read at all are skipped with a warning.
pub fn resolve_values(values: &[Value], rules: &VisibilityRules, now: DateTime<Utc>) -> ResolvedList {
    resolve(values.iter().filter_map(ContentItem::from_value), rules, now)
}
