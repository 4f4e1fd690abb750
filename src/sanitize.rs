//! Strip inline background declarations from CMS-authored HTML.
//!
//! Editors paste content with `style="background-color:#fff"` baked in,
//! which paints white boxes over the site's themed sections (and breaks
//! dark mode entirely). [`sanitize`] removes every inline `background` and
//! `background-color` declaration from every element and leaves all other
//! markup alone.
//!
//! Two paths:
//!
//! - **DOM**: parse with [`dom::Fragment`](crate::dom::Fragment), rewrite the
//!   `style` attribute of each element, drop the attribute if nothing is
//!   left. Untouched elements serialize byte-for-byte.
//! - **Regex**: strip `background(-color)?\s*:\s*[^;"']+;?` from the raw
//!   string. Used when the fragment does not parse.
//!
//! The two paths can differ in whitespace and in whether an emptied
//! `style=""` survives, but neither leaves a background declaration behind.

use crate::dom::{DomError, Fragment};
use maud::{PreEscaped, Render};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static BACKGROUND_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)background(-color)?\s*:\s*[^;"']+;?"#).expect("valid background regex")
});

/// HTML with inline backgrounds removed. Renders into maud templates
/// without escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedHtml(String);

impl SanitizedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Render for SanitizedHtml {
    fn render(&self) -> maud::Markup {
        PreEscaped(self.0.clone())
    }
}

/// Sanitize with the DOM path, falling back to the regex path.
pub fn sanitize(html: &str) -> SanitizedHtml {
    match sanitize_dom(html) {
        Ok(clean) => clean,
        Err(e) => {
            tracing::debug!(error = %e, "falling back to regex sanitizer");
            sanitize_regex(html)
        }
    }
}

pub fn sanitize_dom(html: &str) -> Result<SanitizedHtml, DomError> {
    let mut fragment = Fragment::parse(html)?;
    fragment.walk_mut(|el| {
        let Some(style) = el.attr("style") else {
            return;
        };
        if !has_background_declaration(style) {
            return;
        }
        let cleaned = strip_background_declarations(style);
        if cleaned.is_empty() {
            el.remove_attr("style");
        } else {
            el.set_attr("style", cleaned);
        }
    });
    Ok(SanitizedHtml(fragment.to_html()))
}

pub fn sanitize_regex(html: &str) -> SanitizedHtml {
    SanitizedHtml(BACKGROUND_DECL.replace_all(html, "").into_owned())
}

/// Drop `background` and `background-color` declarations from a style
/// attribute value, keeping the rest in order.
pub fn strip_background_declarations(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or_default().trim();
            !is_background_property(property)
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn has_background_declaration(style: &str) -> bool {
    style
        .split(';')
        .any(|decl| is_background_property(decl.split(':').next().unwrap_or_default().trim()))
}

fn is_background_property(property: &str) -> bool {
    property.eq_ignore_ascii_case("background") || property.eq_ignore_ascii_case("background-color")
}
