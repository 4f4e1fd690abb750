//! CLI output formatting for all pipeline stages.
//!
//! Output is **information-centric**: every line leads with what was
//! fetched, resolved or written, with status and paths as secondary context.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! menus                 200  3 records
//! articles[about-us]    200  1 record
//! courses                 0  FAILED: Request failed: connection refused
//!
//! Fetched 14 sources from https://cms.example/api/v1 (staging), 1 failed
//! ```
//!
//! ## Resolve
//!
//! ```text
//! Sections
//!     hero          ready         2
//!     mission       ready         1  Mission Build capacity...
//!     courses       unavailable   0  Request failed: timeout
//!
//! Pages
//!     001 About Us → about-us/index.html
//!     002 Resources → resources/index.html (placeholder)
//! ```
//!
//! ## Generate
//!
//! ```text
//! Home → index.html
//! 001 About Us → about-us/index.html
//! 002 Resources → resources/index.html (placeholder)
//! Generated 1 home page, 2 content pages (1 placeholder), 3 assets
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::generate::GeneratedSite;
use crate::sections::{Section, SiteModel};
use crate::select::CardLayout;
use crate::snapshot::{FetchEvent, Snapshot};

/// Width of the name column in aligned listings.
const NAME_WIDTH: usize = 20;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Stage 1: Fetch output
// ============================================================================

/// Format one fetch progress event.
pub fn format_fetch_event(event: &FetchEvent) -> Vec<String> {
    let detail = match &event.outcome {
        Ok(count) => plural(*count, "record", "records"),
        Err(message) => format!("FAILED: {}", truncate(message, 80)),
    };
    vec![format!(
        "{:<width$}{:>4}  {}",
        event.source_name,
        event.status,
        detail,
        width = NAME_WIDTH
    )]
}

/// Number of envelopes a snapshot holds.
fn source_count(snapshot: &Snapshot) -> usize {
    crate::cms::Collection::ALL.len()
        + snapshot.menu_articles.len()
        + snapshot.menu_banners.len()
        + 2
        + usize::from(snapshot.domain_topics.is_some())
}

/// Closing summary of a fetch run.
pub fn format_fetch_summary(snapshot: &Snapshot) -> Vec<String> {
    let failures = snapshot.failures();
    let mut lines = vec![
        String::new(),
        format!(
            "Fetched {} from {} ({}), {} failed",
            plural(source_count(snapshot), "source", "sources"),
            snapshot.endpoints.cms,
            snapshot.endpoints.environment,
            failures.len()
        ),
    ];
    for (name, error) in failures {
        lines.push(format!("    {name}: {}", truncate(&error, 80)));
    }
    lines
}

pub fn print_fetch_event(event: &FetchEvent) {
    for line in format_fetch_event(event) {
        println!("{}", line);
    }
}

pub fn print_fetch_summary(snapshot: &Snapshot) {
    for line in format_fetch_summary(snapshot) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Resolve output
// ============================================================================

fn unavailable_reason<T>(section: &Section<T>) -> Option<&str> {
    match section {
        Section::Unavailable(reason) => Some(reason.as_str()),
        _ => None,
    }
}

/// Format resolve stage output: section states, then content pages.
pub fn format_resolve_output(model: &SiteModel) -> Vec<String> {
    let reasons = [
        unavailable_reason(&model.hero),
        unavailable_reason(&model.mission),
        unavailable_reason(&model.courses),
        unavailable_reason(&model.discussions),
        unavailable_reason(&model.partners),
        unavailable_reason(&model.media),
        unavailable_reason(&model.contacts),
        unavailable_reason(&model.social),
    ];
    let mission_preview = model.mission.ready().map(|m| {
        let html = match &m.layout {
            CardLayout::Split { left, right } => format!("{left} {right}"),
            CardLayout::Whole(block) => block.clone(),
        };
        truncate(&strip_html_tags(&html), 40)
    });

    let mut lines = vec!["Sections".to_string()];
    for ((name, state, count), reason) in model.section_states().into_iter().zip(reasons) {
        let note = match (name, reason) {
            (_, Some(reason)) => Some(truncate(reason, 60)),
            ("mission", None) => mission_preview.clone(),
            _ => None,
        };
        let row = format!("    {:<14}{:<14}{:>3}", name, state, count);
        match note {
            Some(note) if !note.is_empty() => lines.push(format!("{row}  {note}")),
            _ => lines.push(row),
        }
    }

    if !model.pages.is_empty() {
        lines.push(String::new());
        lines.push("Pages".to_string());
        for (i, page) in model.pages.iter().enumerate() {
            let marker = if page.is_placeholder() { " (placeholder)" } else { "" };
            lines.push(format!(
                "    {} {} \u{2192} {}{}",
                format_index(i + 1),
                page.title,
                page.path(),
                marker
            ));
        }
    }
    lines
}

pub fn print_resolve_output(model: &SiteModel) {
    for line in format_resolve_output(model) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format generate stage output showing written HTML files.
pub fn format_generate_output(site: &GeneratedSite) -> Vec<String> {
    let mut lines = vec!["Home \u{2192} index.html".to_string()];
    for (i, page) in site.pages.iter().enumerate() {
        let marker = if page.placeholder { " (placeholder)" } else { "" };
        lines.push(format!(
            "{} {} \u{2192} {}{}",
            format_index(i + 1),
            page.title,
            page.path,
            marker
        ));
    }
    let placeholders = site.pages.iter().filter(|p| p.placeholder).count();
    lines.push(format!(
        "Generated 1 home page, {} ({} placeholder), {}",
        plural(site.pages.len(), "content page", "content pages"),
        placeholders,
        plural(site.assets_copied, "asset", "assets")
    ));
    lines
}

pub fn print_generate_output(site: &GeneratedSite) {
    for line in format_generate_output(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::fetch::Envelope;
    use crate::generate::GeneratedPage;
    use crate::sections::build_site_model;
    use crate::test_helpers::*;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn strip_html_tags_separates_blocks() {
        assert_eq!(strip_html_tags("<h3>Mission</h3><p>Build</p>"), "Mission Build");
        assert_eq!(strip_html_tags("plain text"), "plain text");
        assert_eq!(strip_html_tags(""), "");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("Short text", 40), "Short text");
        assert_eq!(truncate(&"a".repeat(50), 40), format!("{}...", "a".repeat(40)));
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "record", "records"), "1 record");
        assert_eq!(plural(0, "record", "records"), "0 records");
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    #[test]
    fn fetch_event_success_line() {
        let event = FetchEvent {
            source_name: "menus".into(),
            status: 200,
            outcome: Ok(3),
        };
        let lines = format_fetch_event(&event);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("menus "));
        assert!(lines[0].ends_with(" 200  3 records"));
    }

    #[test]
    fn fetch_event_failure_line() {
        let event = FetchEvent {
            source_name: "courses".into(),
            status: 0,
            outcome: Err("Request failed: connection refused".into()),
        };
        let line = &format_fetch_event(&event)[0];
        assert!(line.contains("   0  FAILED: Request failed: connection refused"));
    }

    #[test]
    fn fetch_summary_lists_failures() {
        let mut snapshot = sample_snapshot();
        snapshot.partners = Envelope::failed("HTTP 503", 503);
        let lines = format_fetch_summary(&snapshot);
        assert!(lines[1].starts_with("Fetched 14 sources from https://cms.test/api/v1 (staging), 1 failed"));
        assert_eq!(lines[2], "    partners: HTTP 503");
    }

    // =========================================================================
    // Resolve
    // =========================================================================

    #[test]
    fn resolve_output_lists_sections_and_pages() {
        let model = build_site_model(&sample_snapshot(), &SiteConfig::default(), fixed_now());
        let lines = format_resolve_output(&model);
        assert_eq!(lines[0], "Sections");
        assert!(lines[1].trim_start().starts_with("hero"));
        assert!(lines.iter().any(|l| l.contains("mission") && l.contains("Mission Build capacity")));
        assert!(lines.contains(&"    001 About Us \u{2192} about-us/index.html".to_string()));
        assert!(lines.contains(&"    002 Resources \u{2192} resources/index.html (placeholder)".to_string()));
    }

    #[test]
    fn resolve_output_shows_unavailable_reason() {
        let mut snapshot = sample_snapshot();
        snapshot.contacts = Envelope::failed("Request failed: reset", 0);
        let model = build_site_model(&snapshot, &SiteConfig::default(), fixed_now());
        let lines = format_resolve_output(&model);
        let row = lines.iter().find(|l| l.trim_start().starts_with("contacts")).unwrap();
        assert!(row.contains("unavailable"));
        assert!(row.ends_with("Request failed: reset"));
    }

    // =========================================================================
    // Generate
    // =========================================================================

    #[test]
    fn generate_output_counts_pages() {
        let site = GeneratedSite {
            sections: vec![],
            pages: vec![
                GeneratedPage {
                    title: "About Us".into(),
                    path: "about-us/index.html".into(),
                    placeholder: false,
                },
                GeneratedPage {
                    title: "Resources".into(),
                    path: "resources/index.html".into(),
                    placeholder: true,
                },
            ],
            assets_copied: 1,
        };
        let lines = format_generate_output(&site);
        assert_eq!(lines[0], "Home \u{2192} index.html");
        assert_eq!(lines[1], "001 About Us \u{2192} about-us/index.html");
        assert_eq!(lines[2], "002 Resources \u{2192} resources/index.html (placeholder)");
        assert_eq!(
            lines[3],
            "Generated 1 home page, 2 content pages (1 placeholder), 1 asset"
        );
    }
}
