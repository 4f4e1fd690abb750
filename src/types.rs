//! Shared types used across all pipeline stages.
//!
//! [`ContentItem`] is the one shape every CMS record is read into, whatever
//! the collection (article, banner, contact, partner, menu, slider, media).
//! The CMS is loosely typed: the same field arrives in camelCase from one
//! collection and snake_case from another, display orders come as numbers or
//! numeric strings, and legacy records omit `state` entirely. Deserialization
//! here is therefore lenient field by field, so a single odd value degrades
//! that field to its default instead of dropping the whole record.
//!
//! Fields the pipeline does not interpret (HTML bodies, image URLs, links)
//! are kept verbatim in [`ContentItem::payload`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Category reference embedded in a CMS record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

/// A single CMS record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Opaque identifier. Numeric ids are kept in their decimal form.
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: String,
    /// Raw publish state (`Published`, `Draft`, ...). Empty when the record
    /// has no state field.
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(
        default,
        rename = "isActive",
        alias = "is_active",
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<bool>,
    #[serde(
        default,
        rename = "displayOrder",
        alias = "display_order",
        deserialize_with = "lenient_order"
    )]
    pub display_order: i64,
    #[serde(
        default,
        rename = "startPublish",
        alias = "start_publish",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_publish: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "endPublish",
        alias = "end_publish",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_publish: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Category>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Every other field of the record, untouched.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ContentItem {
    /// `isActive` absent means active; only an explicit `false` hides a record.
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }

    pub fn category_slug(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.slug.as_str())
    }

    /// Display label: title, then name, then slug.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.slug)
    }

    /// First non-empty string among the given payload keys.
    ///
    /// CMS collections disagree on field names (`content` vs `description`,
    /// `image` vs `image_url`), so callers list every spelling they accept.
    pub fn text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.payload.get(*k))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Parse one raw JSON record. Non-object values are rejected.
    ///
    /// When a record carries both spellings of a field, the camelCase value
    /// wins and the snake_case one is dropped before deserializing.
    pub fn from_value(value: &Value) -> Option<ContentItem> {
        let Some(object) = value.as_object() else {
            tracing::warn!(%value, "skipping record that is not a JSON object");
            return None;
        };
        let mut object = object.clone();
        for (camel, snake) in FIELD_ALIASES {
            if object.contains_key(camel) {
                object.remove(snake);
            }
        }
        match serde_json::from_value(Value::Object(object)) {
            Ok(item) => Some(item),
            Err(error) => {
                tracing::warn!(%error, %value, "skipping unreadable record");
                None
            }
        }
    }
}

/// Fields the CMS sends in either case style, as `(camelCase, snake_case)`.
const FIELD_ALIASES: [(&str, &str); 4] = [
    ("isActive", "is_active"),
    ("displayOrder", "display_order"),
    ("startPublish", "start_publish"),
    ("endPublish", "end_publish"),
];

// =============================================================================
// Lenient field deserializers
// =============================================================================

fn opaque_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    })
}

fn lenient_order<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_category<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Category>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => {
            let field = |k: &str| {
                map.get(k)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Some(Category {
                slug: field("slug"),
                name: field("name"),
            })
        }
        Value::String(slug) => Some(Category {
            name: slug.clone(),
            slug,
        }),
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(d)?;
    let parsed = match &value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(%value, "ignoring unparseable publish timestamp");
    }
    Ok(parsed)
}

/// Parse the timestamp spellings the CMS emits.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC), and a bare `YYYY-MM-DD` (start of that day, UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_record() {
        let item = ContentItem::from_value(&json!({
            "id": 42,
            "slug": "our-mission",
            "state": "Published",
            "isActive": true,
            "displayOrder": 3,
            "startPublish": "2024-01-01T00:00:00Z",
            "category": {"slug": "about", "name": "About"},
            "content": "<p>hi</p>"
        }))
        .unwrap();

        assert_eq!(item.id, "42");
        assert_eq!(item.slug, "our-mission");
        assert_eq!(item.active, Some(true));
        assert_eq!(item.display_order, 3);
        assert!(item.start_publish.is_some());
        assert_eq!(item.category_slug(), Some("about"));
        assert_eq!(item.text(&["content"]), Some("<p>hi</p>"));
    }

    #[test]
    fn camel_case_wins_when_both_spellings_present() {
        let item = ContentItem::from_value(&json!({
            "slug": "dup",
            "isActive": false,
            "is_active": true,
            "displayOrder": 2,
            "display_order": 5,
            "startPublish": "2024-01-01",
            "start_publish": "2099-01-01",
            "endPublish": "2030-01-01",
            "end_publish": "bogus"
        }))
        .unwrap();

        assert_eq!(item.active, Some(false));
        assert_eq!(item.display_order, 2);
        assert_eq!(item.start_publish.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(item.end_publish.is_some());
        assert!(!item.payload.contains_key("is_active"));
    }

    #[test]
    fn parses_snake_case_record() {
        let item = ContentItem::from_value(&json!({
            "id": "a1",
            "is_active": false,
            "display_order": "7",
            "end_publish": "2030-06-30"
        }))
        .unwrap();

        assert_eq!(item.active, Some(false));
        assert!(!item.is_active());
        assert_eq!(item.display_order, 7);
        assert_eq!(
            item.end_publish,
            Some(Utc.with_ymd_and_hms(2030, 6, 30, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let item = ContentItem::from_value(&json!({})).unwrap();
        assert_eq!(item.state, "");
        assert_eq!(item.display_order, 0);
        assert!(item.is_active());
        assert!(item.category.is_none());
    }

    #[test]
    fn odd_values_degrade_per_field() {
        let item = ContentItem::from_value(&json!({
            "slug": "x",
            "displayOrder": "first",
            "isActive": "yes",
            "startPublish": "not a date",
            "state": null
        }))
        .unwrap();

        assert_eq!(item.slug, "x");
        assert_eq!(item.display_order, 0);
        assert_eq!(item.active, None);
        assert!(item.start_publish.is_none());
        assert_eq!(item.state, "");
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(ContentItem::from_value(&json!("just a string")).is_none());
        assert!(ContentItem::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn category_as_bare_string() {
        let item = ContentItem::from_value(&json!({"category": "news"})).unwrap();
        assert_eq!(item.category_slug(), Some("news"));
    }

    #[test]
    fn unknown_fields_kept_in_payload() {
        let item = ContentItem::from_value(&json!({
            "slug": "partner-a",
            "logo_url": "https://example.org/a.png"
        }))
        .unwrap();
        assert_eq!(
            item.payload.get("logo_url").and_then(Value::as_str),
            Some("https://example.org/a.png")
        );
        assert!(!item.payload.contains_key("slug"));
    }

    #[test]
    fn label_prefers_title_then_name() {
        let mut item = ContentItem {
            slug: "s".into(),
            ..Default::default()
        };
        assert_eq!(item.label(), "s");
        item.name = Some("Name".into());
        assert_eq!(item.label(), "Name");
        item.title = Some("Title".into());
        assert_eq!(item.label(), "Title");
    }

    #[test]
    fn text_skips_blank_values() {
        let item = ContentItem::from_value(&json!({
            "content": "   ",
            "description": "fallback"
        }))
        .unwrap();
        assert_eq!(item.text(&["content", "description"]), Some("fallback"));
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T16:00:00+05:30"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T10:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-01"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn epoch_millis_timestamp() {
        let item = ContentItem::from_value(&json!({"startPublish": 1_700_000_000_000i64})).unwrap();
        assert_eq!(
            item.start_publish,
            Utc.timestamp_millis_opt(1_700_000_000_000).single()
        );
    }
}
