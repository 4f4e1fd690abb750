//! Stage 2: resolve a fetched snapshot into render-ready view models.
//!
//! Each home page section has its own visibility rules and its own view
//! model, but all of them go through the same steps: check the envelope,
//! [`resolve`](crate::resolve) the records, optionally
//! [`select`](crate::select) one, sanitize HTML fields, and shape the result
//! into plain structs the templates can render without further logic.
//!
//! ## Section states
//!
//! Errors never cross a section boundary. Every section ends up as one of:
//!
//! | State | When | Rendered as |
//! |-------|------|-------------|
//! | [`Section::Ready`] | records survived resolution | the section |
//! | [`Section::Empty`] | fetch succeeded, nothing visible | "no items available" or nothing |
//! | [`Section::Unavailable`] | fetch failed | "unable to load" notice |
//!
//! ## Rule sets
//!
//! | Section | Source | State | Category |
//! |---------|--------|-------|----------|
//! | hero slider | `sliders` | published | - |
//! | mission cards | `articles` of the about menu | published | - |
//! | partners | `partners` | published | - |
//! | media | `media` | published | `media_category`, ignoring case |
//! | contacts | `contacts` | published | `contact_category`, exact |
//! | social links | `social-links` | published or blank | - |
//! | navigation | `menus` | published | - |
//!
//! All rule sets require the active flag and the publish window.

use crate::config::{Environment, SiteConfig};
use crate::fetch::Envelope;
use crate::lms::{Course, SearchResult, Topic};
use crate::pages::{ContentPage, build_pages, is_safe_slug};
use crate::resolve::{StatePolicy, VisibilityRules, resolve_values};
use crate::sanitize::{SanitizedHtml, sanitize};
use crate::select::{CardLayout, select};
use crate::snapshot::Snapshot;
use crate::types::ContentItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render state of one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Empty,
    /// The fetch failed; carries the error for diagnostics.
    Unavailable(String),
}

impl<T> Section<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }

    /// Short state name for output and logs.
    pub fn state_name(&self) -> &'static str {
        match self {
            Section::Ready(_) => "ready",
            Section::Empty => "empty",
            Section::Unavailable(_) => "unavailable",
        }
    }
}

impl<T> Section<Vec<T>> {
    /// `Ready` for a non-empty list, `Empty` otherwise.
    pub fn from_list(items: Vec<T>) -> Self {
        if items.is_empty() {
            Section::Empty
        } else {
            Section::Ready(items)
        }
    }

    pub fn len(&self) -> usize {
        self.ready().map_or(0, Vec::len)
    }
}

// ============================================================================
// View models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub slug: String,
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub description: SanitizedHtml,
    pub image: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
}

/// The mission block: one CMS article shown as a pair of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub title: String,
    /// Card markup, already sanitized.
    pub layout: CardLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseCard {
    pub identifier: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub organisation: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCard {
    pub title: String,
    pub url: String,
    pub posts: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoCard {
    pub name: String,
    pub logo: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCard {
    pub title: String,
    pub description: SanitizedHtml,
    pub image: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactCard {
    pub title: String,
    pub address: SanitizedHtml,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
}

/// Everything the generate stage needs, written to `site.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteModel {
    pub generated_at: DateTime<Utc>,
    pub environment: Environment,
    pub nulp_url: String,
    pub nav: Vec<NavLink>,
    pub hero: Section<Vec<Slide>>,
    pub mission: Section<Mission>,
    pub courses: Section<Vec<CourseCard>>,
    pub discussions: Section<Vec<TopicCard>>,
    pub partners: Section<Vec<LogoCard>>,
    pub media: Section<Vec<MediaCard>>,
    pub contacts: Section<Vec<ContactCard>>,
    pub social: Section<Vec<SocialLink>>,
    pub pages: Vec<ContentPage>,
    pub config: SiteConfig,
}

impl SiteModel {
    /// `(name, state, item count)` of every home page section, in page order.
    pub fn section_states(&self) -> Vec<(&'static str, &'static str, usize)> {
        vec![
            ("hero", self.hero.state_name(), self.hero.len()),
            ("mission", self.mission.state_name(), usize::from(self.mission.is_ready())),
            ("courses", self.courses.state_name(), self.courses.len()),
            ("discussions", self.discussions.state_name(), self.discussions.len()),
            ("partners", self.partners.state_name(), self.partners.len()),
            ("media", self.media.state_name(), self.media.len()),
            ("contacts", self.contacts.state_name(), self.contacts.len()),
            ("social", self.social.state_name(), self.social.len()),
        ]
    }
}

// ============================================================================
// Field lookups
// ============================================================================

const DESCRIPTION_KEYS: &[&str] = &["description", "content", "subtitle", "body"];
const IMAGE_KEYS: &[&str] = &["image", "image_url", "imageUrl", "thumbnail", "banner_image"];
const LINK_KEYS: &[&str] = &["link", "url", "button_link", "buttonLink"];
const LINK_TEXT_KEYS: &[&str] = &["button_text", "buttonText", "link_text"];
const LOGO_KEYS: &[&str] = &["logo", "logo_url", "logoUrl", "image", "image_url"];
const CONTENT_KEYS: &[&str] = &["content", "body", "description"];
const ADDRESS_KEYS: &[&str] = &["address", "content", "description"];
const PHONE_KEYS: &[&str] = &["phone", "mobile", "contact_number"];
const ICON_KEYS: &[&str] = &["icon", "icon_url", "iconUrl", "image"];

fn owned(item: &ContentItem, keys: &[&str]) -> Option<String> {
    item.text(keys).map(str::to_string)
}

fn html(item: &ContentItem, keys: &[&str]) -> SanitizedHtml {
    sanitize(item.text(keys).unwrap_or_default())
}

// ============================================================================
// Section builders
// ============================================================================

/// Resolve one collection and map each visible record to a card.
///
/// A failed envelope is `Unavailable`; records the view cannot use (no link
/// for a social icon, say) are dropped.
pub fn list_section<V>(
    name: &str,
    envelope: &Envelope<Vec<Value>>,
    rules: &VisibilityRules,
    now: DateTime<Utc>,
    view: impl Fn(&ContentItem) -> Option<V>,
) -> Section<Vec<V>> {
    let values = match (envelope.success, envelope.data.as_deref()) {
        (true, Some(values)) => values,
        (true, None) => &[],
        (false, _) => {
            let error = envelope.error.clone().unwrap_or_default();
            tracing::warn!(section = name, %error, "section unavailable");
            return Section::Unavailable(error);
        }
    };
    let resolved = resolve_values(values, rules, now);
    tracing::debug!(section = name, fetched = values.len(), visible = resolved.len(), "resolved");
    Section::from_list(resolved.iter().filter_map(view).collect())
}

pub fn nav_links(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<NavLink> {
    let section = list_section("nav", &snapshot.menus, &VisibilityRules::published(), now, |item| {
        let slug = item.slug.trim();
        if slug.is_empty() {
            return None;
        }
        if !is_safe_slug(slug) {
            tracing::warn!(slug, "skipping menu whose slug is not a safe path segment");
            return None;
        }
        Some(NavLink {
            slug: slug.to_string(),
            title: item.label().to_string(),
            href: format!("/{slug}/"),
        })
    });
    let mut links = match section {
        Section::Ready(links) => links,
        _ => Vec::new(),
    };
    let mut seen = std::collections::HashSet::new();
    links.retain(|link| seen.insert(link.slug.clone()));
    links
}

pub fn hero_section(snapshot: &Snapshot, now: DateTime<Utc>) -> Section<Vec<Slide>> {
    list_section("hero", &snapshot.sliders, &VisibilityRules::published(), now, |item| {
        Some(Slide {
            title: item.label().to_string(),
            description: html(item, DESCRIPTION_KEYS),
            image: owned(item, IMAGE_KEYS),
            link: owned(item, LINK_KEYS),
            link_text: owned(item, LINK_TEXT_KEYS),
        })
    })
}

/// The mission article: looked up in the about menu's articles first, then
/// in the full article collection.
pub fn mission_section(snapshot: &Snapshot, config: &SiteConfig, now: DateTime<Utc>) -> Section<Mission> {
    let key = config.sections.mission_key.as_str();
    let sources = [
        snapshot.menu_articles.get(&config.sections.about_menu),
        Some(&snapshot.articles),
    ];
    let mut last_error = None;
    for envelope in sources.into_iter().flatten() {
        let items = match list_section("mission", envelope, &VisibilityRules::published(), now, |item| {
            Some(item.clone())
        }) {
            Section::Ready(items) => items,
            Section::Empty => continue,
            Section::Unavailable(e) => {
                last_error = Some(e);
                continue;
            }
        };
        let Some(item) = select(&items, key) else {
            continue;
        };
        let body = html(item, CONTENT_KEYS);
        if body.is_blank() {
            return Section::Empty;
        }
        return Section::Ready(Mission {
            title: item.label().to_string(),
            layout: CardLayout::from_html(body.as_str()),
        });
    }
    match last_error {
        Some(error) => Section::Unavailable(error),
        None => {
            tracing::debug!(key, "no mission article");
            Section::Empty
        }
    }
}

pub fn course_section(
    courses: &Envelope<SearchResult>,
    nulp_url: &str,
    limit: usize,
) -> Section<Vec<CourseCard>> {
    let result = match (courses.success, &courses.data) {
        (true, Some(result)) => result,
        (true, None) => return Section::Empty,
        (false, _) => {
            let error = courses.error.clone().unwrap_or_default();
            tracing::warn!(section = "courses", %error, "section unavailable");
            return Section::Unavailable(error);
        }
    };
    let base = nulp_url.trim_end_matches('/');
    let cards = result
        .content
        .iter()
        .filter(|c| !c.identifier.is_empty())
        .take(limit)
        .map(|c: &Course| CourseCard {
            identifier: c.identifier.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            image: c.app_icon.clone(),
            organisation: c.first_organisation().map(str::to_string),
            url: format!("{base}/webapp/course/{}", c.identifier),
        })
        .collect();
    Section::from_list(cards)
}

pub fn discussion_section(
    topics: &Envelope<Vec<Topic>>,
    nulp_url: &str,
    limit: usize,
) -> Section<Vec<TopicCard>> {
    let list = match (topics.success, &topics.data) {
        (true, Some(list)) => list,
        (true, None) => return Section::Empty,
        (false, _) => {
            let error = topics.error.clone().unwrap_or_default();
            tracing::warn!(section = "discussions", %error, "section unavailable");
            return Section::Unavailable(error);
        }
    };
    let base = nulp_url.trim_end_matches('/');
    let cards = list
        .iter()
        .filter(|t| !t.title.trim().is_empty())
        .take(limit)
        .map(|t| TopicCard {
            title: t.title.clone(),
            url: if t.slug.is_empty() {
                format!("{base}/discussion-forum/topic/{}", t.tid)
            } else {
                format!("{base}/discussion-forum/topic/{}", t.slug)
            },
            posts: t.post_count,
            views: t.view_count,
        })
        .collect();
    Section::from_list(cards)
}

pub fn partner_section(snapshot: &Snapshot, now: DateTime<Utc>) -> Section<Vec<LogoCard>> {
    list_section("partners", &snapshot.partners, &VisibilityRules::published(), now, |item| {
        Some(LogoCard {
            name: item.label().to_string(),
            logo: owned(item, LOGO_KEYS),
            link: owned(item, LINK_KEYS),
        })
    })
}

pub fn media_section(snapshot: &Snapshot, config: &SiteConfig, now: DateTime<Utc>) -> Section<Vec<MediaCard>> {
    let rules = match &config.sections.media_category {
        Some(category) => VisibilityRules::published().in_category_ignore_case(category.as_str()),
        None => VisibilityRules::published(),
    };
    list_section("media", &snapshot.media, &rules, now, |item| {
        Some(MediaCard {
            title: item.label().to_string(),
            description: html(item, DESCRIPTION_KEYS),
            image: owned(item, IMAGE_KEYS),
            link: owned(item, &["url", "link", "video_url", "media_url"]),
        })
    })
}

pub fn contact_section(snapshot: &Snapshot, config: &SiteConfig, now: DateTime<Utc>) -> Section<Vec<ContactCard>> {
    let rules = VisibilityRules::published().in_category(config.sections.contact_category.as_str());
    list_section("contacts", &snapshot.contacts, &rules, now, |item| {
        Some(ContactCard {
            title: item.label().to_string(),
            address: html(item, ADDRESS_KEYS),
            email: owned(item, &["email"]),
            phone: owned(item, PHONE_KEYS),
        })
    })
}

pub fn social_section(snapshot: &Snapshot, now: DateTime<Utc>) -> Section<Vec<SocialLink>> {
    let rules = VisibilityRules::published().with_state(StatePolicy::PublishedOrBlank);
    list_section("social", &snapshot.social_links, &rules, now, |item| {
        let url = owned(item, LINK_KEYS)?;
        Some(SocialLink {
            platform: item.slug.to_ascii_lowercase(),
            name: item.label().to_string(),
            url,
            icon: owned(item, ICON_KEYS),
        })
    })
}

/// Resolve a whole snapshot.
pub fn build_site_model(snapshot: &Snapshot, config: &SiteConfig, now: DateTime<Utc>) -> SiteModel {
    let nulp = snapshot.endpoints.nulp.as_str();
    let topics = snapshot
        .domain_topics
        .as_ref()
        .unwrap_or(&snapshot.popular_topics);
    let nav = nav_links(snapshot, now);
    let pages = build_pages(snapshot, &nav, now);

    SiteModel {
        generated_at: now,
        environment: snapshot.endpoints.environment,
        nulp_url: nulp.to_string(),
        hero: hero_section(snapshot, now),
        mission: mission_section(snapshot, config, now),
        courses: course_section(&snapshot.courses, nulp, config.sections.course_limit as usize),
        discussions: discussion_section(topics, nulp, config.sections.discussion_limit),
        partners: partner_section(snapshot, now),
        media: media_section(snapshot, config, now),
        contacts: contact_section(snapshot, config, now),
        social: social_section(snapshot, now),
        nav,
        pages,
        config: config.clone(),
    }
}

pub fn save_site_model(model: &SiteModel, path: &Path) -> Result<(), ResolveError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(model)?)?;
    Ok(())
}

pub fn load_site_model(path: &Path) -> Result<SiteModel, ResolveError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
