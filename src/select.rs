//! Picking one record out of a resolved list, and splitting one CMS block
//! into a pair of cards.
//!
//! ## Selection
//!
//! Sections that show a single record (the mission block, a menu's banner)
//! look it up by a key that editors may have put in any of three places.
//! [`select`] tries, in order:
//!
//! 1. slug equals the key (case-insensitive)
//! 2. name equals the key (case-insensitive)
//! 3. category slug equals the key (exact)
//!
//! Each pass scans the whole list, so a slug match later in the list beats
//! a name match earlier in it. Within a pass the first item in list order
//! wins.
//!
//! ## Two-slot split
//!
//! Editors author the "mission / vision" pair as a single rich-text block
//! with two top-level `<div>`s. [`split_two_slots`] returns the inner
//! markup of the first two top-level elements. Anything else (one element,
//! plain text, markup that does not parse) is not splittable and the caller
//! renders the block whole.

use crate::dom::Fragment;
use crate::types::ContentItem;
use serde::{Deserialize, Serialize};

/// Which field produced a [`select`] match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Slug,
    Name,
    Category,
}

/// First item matching `key` by slug, then name, then category slug.
pub fn select<'a>(items: &'a [ContentItem], key: &str) -> Option<&'a ContentItem> {
    select_with_reason(items, key).map(|(item, _)| item)
}

pub fn select_with_reason<'a>(
    items: &'a [ContentItem],
    key: &str,
) -> Option<(&'a ContentItem, MatchedBy)> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    if let Some(item) = items.iter().find(|i| i.slug.eq_ignore_ascii_case(key)) {
        return Some((item, MatchedBy::Slug));
    }
    if let Some(item) = items
        .iter()
        .find(|i| i.name.as_deref().is_some_and(|n| n.trim().eq_ignore_ascii_case(key)))
    {
        return Some((item, MatchedBy::Name));
    }
    items
        .iter()
        .find(|i| i.category_slug() == Some(key))
        .map(|item| (item, MatchedBy::Category))
}

/// Inner markup of the first two top-level elements of `html`, or `None`
/// when the block is not splittable.
pub fn split_two_slots(html: &str) -> Option<(String, String)> {
    let fragment = Fragment::parse(html).ok()?;
    let mut elements = fragment.elements();
    let first = elements.next()?.inner_html();
    let second = elements.next()?.inner_html();
    Some((first, second))
}

/// How a paired-card block renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardLayout {
    Split { left: String, right: String },
    Whole(String),
}

impl CardLayout {
    pub fn from_html(html: &str) -> Self {
        match split_two_slots(html) {
            Some((left, right)) => CardLayout::Split { left, right },
            None => {
                tracing::debug!("block has fewer than two top-level elements; rendering whole");
                CardLayout::Whole(html.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn falls_back_from_slug_to_name() {
        let items = vec![item("a").build(), item("b").name("our-mission").build()];
        let (found, by) = select_with_reason(&items, "our-mission").unwrap();
        assert_eq!(found.slug, "b");
        assert_eq!(by, MatchedBy::Name);
    }

    #[test]
    fn slug_match_beats_earlier_name_match() {
        let items = vec![
            item("x").name("mission").build(),
            item("mission").build(),
        ];
        assert_eq!(select(&items, "mission").unwrap().slug, "mission");
    }

    #[test]
    fn slug_and_name_ignore_case() {
        let items = vec![item("Our-Mission").build(), item("c").name("VISION").build()];
        assert_eq!(select(&items, "our-mission").unwrap().slug, "Our-Mission");
        assert_eq!(select(&items, "vision").unwrap().slug, "c");
    }

    #[test]
    fn category_is_last_resort_and_exact() {
        let items = vec![item("a").category("hero").build(), item("b").category("Hero").build()];
        let (found, by) = select_with_reason(&items, "Hero").unwrap();
        assert_eq!(found.slug, "b");
        assert_eq!(by, MatchedBy::Category);
    }

    #[test]
    fn first_in_list_order_wins() {
        let items = vec![item("dup").order(5).build(), item("DUP").order(1).build()];
        assert_eq!(select(&items, "dup").unwrap().display_order, 5);
    }

    #[test]
    fn empty_list_or_key_is_not_found() {
        assert!(select(&[], "anything").is_none());
        assert!(select(&[item("a").build()], "  ").is_none());
        assert!(select(&[item("a").build()], "b").is_none());
    }

    #[test]
    fn split_two_top_level_elements() {
        let html = "<div><h3>Mission</h3><p>m</p></div>\n<div><h3>Vision</h3></div><div>third</div>";
        let (left, right) = split_two_slots(html).unwrap();
        assert_eq!(left, "<h3>Mission</h3><p>m</p>");
        assert_eq!(right, "<h3>Vision</h3>");
    }

    #[test]
    fn single_element_is_not_splittable() {
        assert!(split_two_slots("<div>only</div>").is_none());
        assert!(split_two_slots("plain text").is_none());
        assert!(split_two_slots("").is_none());
    }

    #[test]
    fn layout_falls_back_to_whole_block() {
        let html = "<p>just one paragraph</p>";
        assert_eq!(CardLayout::from_html(html), CardLayout::Whole(html.to_string()));
        assert_eq!(
            CardLayout::from_html("<p>a</p><p>b</p>"),
            CardLayout::Split {
                left: "a".into(),
                right: "b".into()
            }
        );
    }
}
