//! Stage 3: render the resolved site model to plain HTML.
//!
//! Reads `site.json` and writes a self-contained static site. There is no
//! client-side framework: every section is rendered at build time and the
//! only script is the carousel driver.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html              # home: hero, mission, courses, discussions,
//! │                           #       partners, media, contacts
//! ├── style.css               # color + carousel custom properties, then static CSS
//! ├── carousel.js             # drag / dots / auto-scroll driver
//! ├── about-us/
//! │   └── index.html          # one content page per live menu
//! └── ...                     # files copied from the assets directory
//! ```
//!
//! Stylesheet and script are linked with a `?v=` query holding the first
//! eight hex digits of their SHA-256, so a content change busts caches.
//!
//! ## Section rendering
//!
//! | State | Listing sections | Decorative sections |
//! |-------|------------------|---------------------|
//! | `Ready` | the section | the section |
//! | `Empty` | "No items available." | nothing |
//! | `Unavailable` | "Unable to load ... Please try again later." | nothing |
//!
//! Listing sections are courses, discussions and contacts. Hero, mission,
//! partners, media and social links are decorative and stay silent.
//!
//! ## Carousels
//!
//! Every carousel gets its layout from [`Scroller`] and carries it as
//! `data-per-view`, `data-total-slides`, `data-step` and
//! `data-auto-scroll-ms`. Navigation buttons and dots are only emitted when
//! there is more than one window position.

use crate::config::{CarouselConfig, Environment, generate_carousel_css, generate_color_css};
use crate::pages::{Banner, ContentPage, PageBody, is_safe_slug};
use crate::scroller::{Geometry, Scroller};
use crate::sections::{
    ContactCard, CourseCard, LogoCard, MediaCard, Mission, NavLink, ResolveError, Section,
    SiteModel, Slide, SocialLink, TopicCard, load_site_model,
};
use crate::select::CardLayout;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read site model: {0}")]
    Model(#[from] ResolveError),
    #[error("failed to copy assets: {0}")]
    Walk(#[from] walkdir::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const CAROUSEL_JS: &str = include_str!("../static/carousel.js");

const SITE_TITLE: &str = "NULP";

/// One written HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPage {
    pub title: String,
    /// Path relative to the output directory.
    pub path: String,
    pub placeholder: bool,
}

/// What a generate run wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSite {
    pub sections: Vec<(&'static str, &'static str, usize)>,
    pub pages: Vec<GeneratedPage>,
    pub assets_copied: usize,
}

/// Linked static files and their cache-busting hrefs.
struct StaticFiles {
    css: String,
    css_href: String,
    js_href: String,
}

impl StaticFiles {
    fn for_model(model: &SiteModel) -> Self {
        let css = site_css(model);
        Self {
            css_href: versioned("style.css", &css),
            js_href: versioned("carousel.js", CAROUSEL_JS),
            css,
        }
    }
}

fn versioned(name: &str, content: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(content.as_bytes()));
    format!("/{name}?v={}", &digest[..8])
}

/// Full stylesheet: generated custom properties followed by the static rules.
pub fn site_css(model: &SiteModel) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        generate_color_css(&model.config.colors),
        generate_carousel_css(&model.config.carousel),
        CSS_STATIC
    )
}

pub fn generate(
    site_path: &Path,
    output_dir: &Path,
    assets_dir: Option<&Path>,
) -> Result<GeneratedSite, GenerateError> {
    let model = load_site_model(site_path)?;
    render_site(&model, output_dir, assets_dir)
}

/// Write the whole site for an already loaded model.
pub fn render_site(
    model: &SiteModel,
    output_dir: &Path,
    assets_dir: Option<&Path>,
) -> Result<GeneratedSite, GenerateError> {
    fs::create_dir_all(output_dir)?;
    let files = StaticFiles::for_model(model);

    // Assets first so generated files win on name clashes.
    let assets_copied = match assets_dir {
        Some(dir) => copy_assets(dir, output_dir)?,
        None => 0,
    };

    fs::write(output_dir.join("style.css"), &files.css)?;
    fs::write(output_dir.join("carousel.js"), CAROUSEL_JS)?;

    let home = render_home(model, &files);
    fs::write(output_dir.join("index.html"), home.into_string())?;

    let mut pages = Vec::with_capacity(model.pages.len());
    for page in &model.pages {
        if !is_safe_slug(&page.slug) {
            tracing::warn!(page = %page.slug, "not writing page with unsafe slug");
            continue;
        }
        let html = render_content_page(page, model, &files);
        let path = page.path();
        let target = output_dir.join(&path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, html.into_string())?;
        tracing::debug!(page = %page.slug, placeholder = page.is_placeholder(), "wrote page");
        pages.push(GeneratedPage {
            title: page.title.clone(),
            path,
            placeholder: page.is_placeholder(),
        });
    }

    Ok(GeneratedSite {
        sections: model.section_states(),
        pages,
        assets_copied,
    })
}

/// Copy every file under `assets_dir` into `output_dir`, keeping relative
/// paths. A missing directory copies nothing.
fn copy_assets(assets_dir: &Path, output_dir: &Path) -> Result<usize, GenerateError> {
    if !assets_dir.is_dir() {
        tracing::debug!(dir = %assets_dir.display(), "no assets directory");
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(assets_dir).follow_links(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(assets_dir) else {
            continue;
        };
        let target = output_dir.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(title: &str, files: &StaticFiles, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(files.css_href);
                script src=(files.js_href) defer {}
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

fn site_header(nav: &[NavLink], current_slug: &str) -> Markup {
    html! {
        header.site-header {
            a.brand href="/" { (SITE_TITLE) }
            nav.site-nav {
                (render_nav(nav, current_slug))
            }
        }
    }
}

/// Menu links, hamburger style on narrow screens.
pub fn render_nav(links: &[NavLink], current_slug: &str) -> Markup {
    html! {
        input.nav-toggle type="checkbox" id="nav-toggle";
        label.nav-hamburger for="nav-toggle" {
            span.hamburger-line {}
            span.hamburger-line {}
            span.hamburger-line {}
        }
        div.nav-panel {
            label.nav-close for="nav-toggle" { "×" }
            ul {
                @for link in links {
                    li.current[link.slug == current_slug] {
                        a href=(link.href) { (link.title) }
                    }
                }
            }
        }
    }
}

fn site_footer(model: &SiteModel) -> Markup {
    html! {
        footer.site-footer {
            @if let Some(links) = model.social.ready() {
                ul.social-links {
                    @for link in links {
                        li { (social_link(link)) }
                    }
                }
            }
            @if model.environment == Environment::Staging {
                p.environment-marker { "Staging content" }
            }
            p.platform-link {
                a href=(model.nulp_url) { "Visit the learning platform" }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WhenMissing {
    /// Render nothing for `Empty` and `Unavailable`.
    Silent,
    /// Render a short notice in place of the content.
    Notice,
}

fn section_block<T>(
    id: &str,
    heading: &str,
    section: &Section<T>,
    when_missing: WhenMissing,
    body: impl FnOnce(&T) -> Markup,
) -> Markup {
    let notice = when_missing == WhenMissing::Notice;
    html! {
        @match section {
            Section::Ready(data) => {
                section.block id=(id) {
                    h2 { (heading) }
                    (body(data))
                }
            },
            Section::Empty => {
                @if notice {
                    section.block.empty id=(id) {
                        h2 { (heading) }
                        p.section-notice { "No items available." }
                    }
                }
            },
            Section::Unavailable(_) => {
                @if notice {
                    section.block.unavailable id=(id) {
                        h2 { (heading) }
                        p.section-notice {
                            "Unable to load " (heading.to_lowercase()) ". Please try again later."
                        }
                    }
                }
            },
        }
    }
}

fn carousel(name: &str, geometry: Geometry, auto_scroll_ms: u32, cards: Vec<Markup>) -> Markup {
    let scroller = Scroller::new(geometry, cards.len());
    let layout = scroller.layout();
    let scrollable = scroller.is_scrollable();
    html! {
        div.carousel
            data-carousel=(name)
            data-per-view=(layout.per_view)
            data-total-slides=(layout.total_slides)
            data-step=(layout.step)
            data-auto-scroll-ms=(auto_scroll_ms)
            data-index="0"
        {
            @if scrollable {
                button.carousel-prev type="button" aria-label="Previous" { "‹" }
            }
            div.carousel-viewport {
                div.carousel-track style={ "width: " (layout.track_width) "px" } {
                    @for card in &cards {
                        div.carousel-card { (card) }
                    }
                }
            }
            @if scrollable {
                button.carousel-next type="button" aria-label="Next" { "›" }
                div.carousel-dots {
                    @for i in 0..layout.total_slides {
                        button.carousel-dot.active[i == 0]
                            type="button"
                            data-index=(i)
                            aria-label={ "Go to slide " (i + 1) } {}
                    }
                }
            }
        }
    }
}

/// Hero slides span the container, one at a time.
fn hero_geometry(config: &CarouselConfig) -> Geometry {
    Geometry {
        card_width: config.container_width,
        gap: 0,
        visible_count: 1,
        container_width: config.container_width,
    }
}

// ============================================================================
// Cards
// ============================================================================

fn slide(slide: &Slide) -> Markup {
    html! {
        div.slide {
            @if let Some(image) = &slide.image {
                img src=(image) alt=(slide.title);
            }
            div.slide-text {
                h2 { (slide.title) }
                div.slide-description { (slide.description) }
                @if let Some(link) = &slide.link {
                    a.button href=(link) { (slide.link_text.as_deref().unwrap_or("Learn more")) }
                }
            }
        }
    }
}

fn mission_cards(mission: &Mission) -> Markup {
    html! {
        @match &mission.layout {
            CardLayout::Split { left, right } => {
                div.mission-cards {
                    div.card { (PreEscaped(left)) }
                    div.card { (PreEscaped(right)) }
                }
            },
            CardLayout::Whole(block) => {
                div.mission-cards.whole {
                    div.card { (PreEscaped(block)) }
                }
            },
        }
    }
}

fn course_card(course: &CourseCard) -> Markup {
    html! {
        a.course-card href=(course.url) {
            @if let Some(image) = &course.image {
                img src=(image) alt=(course.name) loading="lazy";
            }
            h3 { (course.name) }
            @if let Some(org) = &course.organisation {
                p.organisation { (org) }
            }
            @if let Some(description) = &course.description {
                p.description { (description) }
            }
        }
    }
}

fn topic_card(topic: &TopicCard) -> Markup {
    html! {
        a.topic-card href=(topic.url) {
            h3 { (topic.title) }
            p.topic-stats {
                span { (topic.posts) " posts" }
                span { (topic.views) " views" }
            }
        }
    }
}

fn logo_card(partner: &LogoCard) -> Markup {
    let logo = html! {
        @if let Some(src) = &partner.logo {
            img src=(src) alt=(partner.name) loading="lazy";
        } @else {
            span.logo-name { (partner.name) }
        }
    };
    html! {
        div.logo-card {
            @if let Some(link) = &partner.link {
                a href=(link) target="_blank" rel="noopener" { (logo) }
            } @else {
                (logo)
            }
        }
    }
}

fn media_card(media: &MediaCard) -> Markup {
    html! {
        div.media-card {
            @if let Some(image) = &media.image {
                img src=(image) alt=(media.title) loading="lazy";
            }
            h3 {
                @if let Some(link) = &media.link {
                    a href=(link) { (media.title) }
                } @else {
                    (media.title)
                }
            }
            div.media-description { (media.description) }
        }
    }
}

fn contact_card(contact: &ContactCard) -> Markup {
    html! {
        div.contact-card {
            h3 { (contact.title) }
            @if !contact.address.is_blank() {
                div.address { (contact.address) }
            }
            @if let Some(email) = &contact.email {
                p { a href={ "mailto:" (email) } { (email) } }
            }
            @if let Some(phone) = &contact.phone {
                p { a href={ "tel:" (phone) } { (phone) } }
            }
        }
    }
}

fn social_link(link: &SocialLink) -> Markup {
    html! {
        a.social-link data-platform=(link.platform) href=(link.url) target="_blank" rel="noopener" {
            @if let Some(icon) = &link.icon {
                img src=(icon) alt=(link.name);
            } @else {
                (link.name)
            }
        }
    }
}

fn banner(banner: &Banner) -> Markup {
    html! {
        section.page-banner {
            @if let Some(image) = &banner.image {
                img src=(image) alt=(banner.title);
            }
            h2 { (banner.title) }
            div.banner-description { (banner.description) }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

fn render_home(model: &SiteModel, files: &StaticFiles) -> Markup {
    let carousel_config = &model.config.carousel;
    let cards = Geometry::from_config(carousel_config);
    let auto_ms = carousel_config.auto_scroll_ms;

    let content = html! {
        (site_header(&model.nav, ""))
        main.home {
            @if let Some(slides) = model.hero.ready() {
                section.hero {
                    (carousel("hero", hero_geometry(carousel_config), auto_ms, slides.iter().map(slide).collect()))
                }
            }
            @if let Some(mission) = model.mission.ready() {
                section.block id="mission" {
                    h2 { (mission.title) }
                    (mission_cards(mission))
                }
            }
            (section_block("courses", "Courses", &model.courses, WhenMissing::Notice, |courses| {
                carousel("courses", cards, auto_ms, courses.iter().map(course_card).collect())
            }))
            (section_block("discussions", "Discussions", &model.discussions, WhenMissing::Notice, |topics| {
                html! {
                    div.topic-list {
                        @for topic in topics { (topic_card(topic)) }
                    }
                }
            }))
            (section_block("partners", "Partners", &model.partners, WhenMissing::Silent, |partners| {
                carousel("partners", cards, auto_ms, partners.iter().map(logo_card).collect())
            }))
            (section_block("media", "Media", &model.media, WhenMissing::Silent, |media| {
                carousel("media", cards, auto_ms, media.iter().map(media_card).collect())
            }))
            (section_block("contacts", "Contact Us", &model.contacts, WhenMissing::Notice, |contacts| {
                html! {
                    div.contact-list {
                        @for contact in contacts { (contact_card(contact)) }
                    }
                }
            }))
        }
        (site_footer(model))
    };

    base_document(SITE_TITLE, files, Some("home-page"), content)
}

fn render_content_page(page: &ContentPage, model: &SiteModel, files: &StaticFiles) -> Markup {
    let content = html! {
        (site_header(&model.nav, &page.slug))
        main.content-page {
            h1 { (page.title) }
            @match &page.body {
                PageBody::Content { banner: page_banner, articles } => {
                    @if let Some(b) = page_banner {
                        (banner(b))
                    }
                    @for article in articles {
                        article id=(article.slug) {
                            h2 { (article.title) }
                            div.article-body { (article.body) }
                        }
                    }
                },
                PageBody::Placeholder => {
                    div.placeholder {
                        p { "This content is being prepared. Please check back soon." }
                    }
                },
            }
        }
        (site_footer(model))
    };

    let title = format!("{} | {}", page.title, SITE_TITLE);
    base_document(&title, files, Some("content-page"), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::pages::Article;
    use crate::sanitize::sanitize;
    use crate::sections::build_site_model;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn model() -> SiteModel {
        build_site_model(&sample_snapshot(), &SiteConfig::default(), fixed_now())
    }

    fn files() -> StaticFiles {
        StaticFiles::for_model(&model())
    }

    fn link(slug: &str) -> NavLink {
        NavLink {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            href: format!("/{slug}/"),
        }
    }

    fn course(n: usize) -> CourseCard {
        CourseCard {
            identifier: format!("do_{n}"),
            name: format!("Course {n}"),
            description: None,
            image: None,
            organisation: None,
            url: format!("https://nulp.test/webapp/course/do_{n}"),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[test]
    fn base_document_links_versioned_assets() {
        let doc = base_document("Test", &files(), None, html! { p { "x" } }).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"href="/style.css?v="#));
        assert!(doc.contains(r#"src="/carousel.js?v="#));
    }

    #[test]
    fn versioned_href_changes_with_content() {
        let a = versioned("style.css", "body {}");
        let b = versioned("style.css", "body { color: red }");
        assert_ne!(a, b);
        assert_eq!(a.len(), "/style.css?v=".len() + 8);
    }

    #[test]
    fn nav_marks_current_menu() {
        let html = render_nav(&[link("about-us"), link("resources")], "resources").into_string();
        assert!(html.contains(r#"<li class="current"><a href="/resources/">RESOURCES</a>"#));
        assert!(html.contains(r#"<li><a href="/about-us/">ABOUT-US</a>"#));
    }

    #[test]
    fn stylesheet_starts_with_generated_properties() {
        let css = site_css(&model());
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--card-width: 280px;"));
    }

    #[test]
    fn listing_section_states() {
        let ready = Section::Ready(vec![course(1)]);
        let render = |s: &Section<Vec<CourseCard>>| {
            section_block("courses", "Courses", s, WhenMissing::Notice, |c| {
                html! { @for x in c { (course_card(x)) } }
            })
            .into_string()
        };
        assert!(render(&ready).contains("Course 1"));
        assert!(render(&Section::Empty).contains("No items available."));
        let unavailable = render(&Section::Unavailable("Request failed: reset".into()));
        assert!(unavailable.contains("Unable to load courses. Please try again later."));
        assert!(!unavailable.contains("reset"));
    }

    #[test]
    fn decorative_section_is_silent() {
        let html = section_block::<Vec<LogoCard>>(
            "partners",
            "Partners",
            &Section::Unavailable("boom".into()),
            WhenMissing::Silent,
            |_| html! {},
        )
        .into_string();
        assert!(html.is_empty());
    }

    #[test]
    fn carousel_carries_scroller_layout() {
        let geometry = Geometry::from_config(&CarouselConfig::default());
        let cards = (1..=5).map(|n| course_card(&course(n))).collect();
        let html = carousel("courses", geometry, 5000, cards).into_string();
        assert!(html.contains(r#"data-per-view="3""#));
        assert!(html.contains(r#"data-total-slides="3""#));
        assert!(html.contains(r#"data-step="304""#));
        assert!(html.contains(r#"data-auto-scroll-ms="5000""#));
        assert_eq!(html.matches(r#"<button class="carousel-dot"#).count(), 3);
        assert!(html.contains("carousel-next"));
    }

    #[test]
    fn short_carousel_has_no_controls() {
        let geometry = Geometry::from_config(&CarouselConfig::default());
        let html = carousel("partners", geometry, 0, vec![html! { "one" }]).into_string();
        assert!(html.contains(r#"data-total-slides="1""#));
        assert!(!html.contains("carousel-dot"));
        assert!(!html.contains("carousel-prev"));
    }

    #[test]
    fn split_mission_renders_two_cards() {
        let mission = Mission {
            title: "Our Mission".into(),
            layout: CardLayout::Split {
                left: "<h3>Mission</h3>".into(),
                right: "<h3>Vision</h3>".into(),
            },
        };
        let html = mission_cards(&mission).into_string();
        assert_eq!(html.matches(r#"<div class="card">"#).count(), 2);
        assert!(html.contains("<h3>Vision</h3>"));
    }

    #[test]
    fn slide_html_is_not_escaped_but_title_is() {
        let html = slide(&Slide {
            title: "A & B".into(),
            description: sanitize("<p>Learn</p>"),
            image: None,
            link: Some("/about-us".into()),
            link_text: None,
        })
        .into_string();
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("<p>Learn</p>"));
        assert!(html.contains(r#"<a class="button" href="/about-us">Learn more</a>"#));
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn home_page_renders_sample_sections() {
        let model = model();
        let html = render_home(&model, &files()).into_string();
        assert!(html.contains("Welcome to NULP"));
        assert!(html.contains("<p>Learn together</p>"));
        assert!(!html.contains("background"));
        assert!(html.contains("Head Office"));
        assert!(html.contains("mailto:info@nulp.test"));
        assert!(!html.contains("regional-office"));
        assert!(html.contains(r#"href="/about-us/""#));
    }

    #[test]
    fn placeholder_page_text() {
        let page = ContentPage {
            slug: "resources".into(),
            title: "Resources".into(),
            body: PageBody::Placeholder,
        };
        let html = render_content_page(&page, &model(), &files()).into_string();
        assert!(html.contains("<title>Resources | NULP</title>"));
        assert!(html.contains("This content is being prepared."));
        assert!(html.contains(r#"<li class="current"><a href="/resources/">"#));
    }

    #[test]
    fn content_page_lists_articles() {
        let page = ContentPage {
            slug: "about-us".into(),
            title: "About Us".into(),
            body: PageBody::Content {
                banner: None,
                articles: vec![Article {
                    slug: "about-nulp".into(),
                    title: "About NULP".into(),
                    body: sanitize("<p>National platform</p>"),
                }],
            },
        };
        let html = render_content_page(&page, &model(), &files()).into_string();
        assert!(html.contains(r#"<article id="about-nulp">"#));
        assert!(html.contains("<p>National platform</p>"));
        assert!(!html.contains("being prepared"));
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn render_site_writes_home_pages_and_assets() {
        let tmp = TempDir::new().unwrap();
        let assets = tmp.path().join("assets");
        fs::create_dir_all(assets.join("img")).unwrap();
        fs::write(assets.join("favicon.ico"), b"ico").unwrap();
        fs::write(assets.join("img/logo.svg"), b"<svg/>").unwrap();
        let out = tmp.path().join("dist");

        let site = render_site(&model(), &out, Some(&assets)).unwrap();

        assert!(out.join("index.html").exists());
        assert!(out.join("style.css").exists());
        assert!(out.join("carousel.js").exists());
        assert!(out.join("about-us/index.html").exists());
        assert!(out.join("resources/index.html").exists());
        assert!(out.join("img/logo.svg").exists());
        assert_eq!(site.assets_copied, 2);
        assert_eq!(site.pages.len(), 2);
        assert!(site.pages.iter().any(|p| p.path == "resources/index.html" && p.placeholder));
    }

    #[test]
    fn render_site_never_writes_outside_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let mut model = model();
        for slug in ["../escaped", "nested/page"] {
            model.pages.push(ContentPage {
                slug: slug.to_string(),
                title: "Escaped".into(),
                body: PageBody::Placeholder,
            });
        }

        let site = render_site(&model, &out, None).unwrap();

        assert!(!tmp.path().join("escaped").exists());
        assert!(!out.join("nested").exists());
        assert_eq!(site.pages.len(), 2);
    }

    #[test]
    fn missing_assets_dir_copies_nothing() {
        let tmp = TempDir::new().unwrap();
        let site = render_site(&model(), tmp.path(), Some(&tmp.path().join("nope"))).unwrap();
        assert_eq!(site.assets_copied, 0);
    }

    #[test]
    fn generate_reads_site_json() {
        let tmp = TempDir::new().unwrap();
        let site_json = tmp.path().join("site.json");
        crate::sections::save_site_model(&model(), &site_json).unwrap();
        let out = tmp.path().join("dist");
        let site = generate(&site_json, &out, None).unwrap();
        assert_eq!(site.sections.len(), 8);
        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains("Welcome to NULP"));
    }

    #[test]
    fn generate_missing_site_json_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = generate(&tmp.path().join("missing.json"), tmp.path(), None);
        assert!(matches!(result, Err(GenerateError::Model(_))));
    }
}
