//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [endpoints]
//! staging_markers = ["dev"]   # hostnames containing one of these use staging
//!
//! [endpoints.staging]
//! cms = "https://devcms.nulp.niua.org/api/v1"
//! nulp = "https://devnulp.niua.org"
//!
//! [endpoints.production]
//! cms = "https://cms.nulp.niua.org/api/v1"
//! nulp = "https://nulp.niua.org"
//!
//! [fetch]
//! # timeout_secs = 30       # Per-request timeout (omit for none)
//! # max_parallel = 4        # Parallel fetches (omit for auto = CPU cores)
//!
//! [sections]
//! about_menu = "about-us"
//! mission_key = "our-mission"
//! contact_category = "about-page-contact-us"
//! course_limit = 12
//! course_categories = ["Course"]
//! # discussion_domain = "urban-planning"
//! discussion_limit = 6
//!
//! [carousel]
//! card_width = 280
//! gap = 24
//! visible_count = 4
//! container_width = 1200
//! auto_scroll_ms = 5000
//!
//! [colors.light]
//! background = "#ffffff"
//! ...
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// CMS and learning-platform hosts per environment.
    pub endpoints: EndpointsConfig,
    /// Outbound request settings.
    pub fetch: FetchConfig,
    /// Slugs and limits that pick content for individual sections.
    pub sections: SectionsConfig,
    /// Geometry shared by every carousel.
    pub carousel: CarouselConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (env, hosts) in [
            ("staging", &self.endpoints.staging),
            ("production", &self.endpoints.production),
        ] {
            for (key, url) in [("cms", &hosts.cms), ("nulp", &hosts.nulp)] {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Validation(format!(
                        "endpoints.{env}.{key} must be an http(s) URL"
                    )));
                }
            }
        }
        if self.fetch.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be positive (omit it for no timeout)".into(),
            ));
        }
        if self.carousel.card_width == 0 {
            return Err(ConfigError::Validation(
                "carousel.card_width must be non-zero".into(),
            ));
        }
        if self.carousel.visible_count == 0 {
            return Err(ConfigError::Validation(
                "carousel.visible_count must be non-zero".into(),
            ));
        }
        if self.sections.course_limit == 0 {
            return Err(ConfigError::Validation(
                "sections.course_limit must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Endpoints and environment selection
// =============================================================================

/// Base URLs of one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostPair {
    /// CMS API base, e.g. `https://cms.nulp.niua.org/api/v1`.
    pub cms: String,
    /// Learning platform base, e.g. `https://nulp.niua.org`.
    pub nulp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointsConfig {
    /// Hostname substrings that select the staging environment, in addition
    /// to `localhost` and loopback addresses.
    pub staging_markers: Vec<String>,
    pub staging: HostPair,
    pub production: HostPair,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            staging_markers: vec!["dev".to_string()],
            staging: HostPair {
                cms: "https://devcms.nulp.niua.org/api/v1".to_string(),
                nulp: "https://devnulp.niua.org".to_string(),
            },
            production: HostPair {
                cms: "https://cms.nulp.niua.org/api/v1".to_string(),
                nulp: "https://nulp.niua.org".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// The environment and base URLs a build talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub environment: Environment,
    pub cms: String,
    pub nulp: String,
}

impl EndpointsConfig {
    /// Pick the environment for a hostname.
    ///
    /// `localhost`, loopback addresses and hostnames containing a staging
    /// marker go to staging; everything else is production.
    pub fn environment_for(&self, hostname: &str) -> Environment {
        let host = hostname.trim().to_ascii_lowercase();
        let host = match host.rsplit_once(':') {
            Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
                name.to_string()
            }
            _ => host.clone(),
        };
        let is_local = host == "localhost" || host.starts_with("127.") || host == "::1";
        let is_marked = self
            .staging_markers
            .iter()
            .any(|m| !m.is_empty() && host.contains(&m.to_ascii_lowercase()));
        if is_local || is_marked {
            Environment::Staging
        } else {
            Environment::Production
        }
    }

    /// Resolve base URLs for a hostname. Trailing slashes are trimmed.
    pub fn select(&self, hostname: &str) -> Endpoints {
        let environment = self.environment_for(hostname);
        let hosts = match environment {
            Environment::Staging => &self.staging,
            Environment::Production => &self.production,
        };
        Endpoints {
            environment,
            cms: hosts.cms.trim_end_matches('/').to_string(),
            nulp: hosts.nulp.trim_end_matches('/').to_string(),
        }
    }
}

// =============================================================================
// Fetch, sections, carousel
// =============================================================================

/// Outbound request settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout in seconds. Absent means requests never time out.
    pub timeout_secs: Option<u64>,
    /// Maximum number of fetches in flight.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_parallel: Option<usize>,
}

/// Resolve the effective fetch parallelism from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &FetchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_parallel
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Slugs and limits that pick content for individual sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionsConfig {
    /// Menu whose articles feed the home page about cards.
    pub about_menu: String,
    /// Slug (or name, or category slug) of the mission block.
    pub mission_key: String,
    /// Category slug of the contact entries shown on the about page.
    pub contact_category: String,
    /// Maximum number of courses requested from the search API.
    pub course_limit: u32,
    /// `primaryCategory` filter for the course search.
    pub course_categories: Vec<String>,
    /// Forum category for the discussions section. Absent = popular topics.
    pub discussion_domain: Option<String>,
    /// Maximum number of discussion topics shown.
    pub discussion_limit: usize,
    /// Category slug limiting the media section, compared ignoring case.
    /// Absent = all published media.
    pub media_category: Option<String>,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            about_menu: "about-us".to_string(),
            mission_key: "our-mission".to_string(),
            contact_category: "about-page-contact-us".to_string(),
            course_limit: 12,
            course_categories: vec!["Course".to_string()],
            discussion_domain: None,
            discussion_limit: 6,
            media_category: None,
        }
    }
}

/// Geometry shared by every carousel (see [`crate::scroller`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselConfig {
    /// Card width in pixels.
    pub card_width: u32,
    /// Gap between cards in pixels.
    pub gap: u32,
    /// Cards visible at once.
    pub visible_count: u32,
    /// Reference container width used for the server-rendered layout.
    pub container_width: u32,
    /// Auto-scroll interval in milliseconds; 0 disables auto-scrolling.
    pub auto_scroll_ms: u32,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            card_width: 280,
            gap: 24,
            visible_count: 4,
            container_width: 1200,
            auto_scroll_ms: 5000,
        }
    }
}

// =============================================================================
// Colors
// =============================================================================

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
///
/// Section backgrounds come from here, which is why CMS HTML has its inline
/// backgrounds stripped (see [`crate::sanitize`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    /// Alternate background for every other section.
    pub surface: String,
    pub text: String,
    pub text_muted: String,
    /// Brand color for buttons, active dots, headings.
    pub accent: String,
    pub border: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            surface: "#f4f7fb".to_string(),
            text: "#1b1f24".to_string(),
            text_muted: "#5f6b7a".to_string(),
            accent: "#054365".to_string(),
            border: "#dde3ea".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0e1217".to_string(),
            surface: "#161c24".to_string(),
            text: "#e8edf2".to_string(),
            text_muted: "#9aa7b5".to_string(),
            accent: "#6fb7e0".to_string(),
            border: "#2a3340".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given `config.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# nulp-site Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Endpoints
# ---------------------------------------------------------------------------
[endpoints]
# The --host hostname picks the environment: localhost, 127.x.x.x, and any
# hostname containing one of these markers use staging; all others production.
staging_markers = ["dev"]

[endpoints.staging]
cms = "https://devcms.nulp.niua.org/api/v1"
nulp = "https://devnulp.niua.org"

[endpoints.production]
cms = "https://cms.nulp.niua.org/api/v1"
nulp = "https://nulp.niua.org"

# ---------------------------------------------------------------------------
# Fetching
# ---------------------------------------------------------------------------
[fetch]
# Per-request timeout in seconds. Omit for no timeout.
# timeout_secs = 30

# Maximum parallel fetches.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_parallel = 4

# ---------------------------------------------------------------------------
# Sections
# ---------------------------------------------------------------------------
[sections]
# Menu whose articles feed the home page about cards.
about_menu = "about-us"

# Slug, name, or category slug of the mission block (split into two cards).
mission_key = "our-mission"

# Category slug of the contact entries on the about page.
contact_category = "about-page-contact-us"

# Courses requested from the learning platform search.
course_limit = 12
course_categories = ["Course"]

# Forum category for the discussions section. Omit for popular topics.
# discussion_domain = "urban-planning"
discussion_limit = 6

# Category slug limiting the media section (case-insensitive). Omit for all.
# media_category = "videos"

# ---------------------------------------------------------------------------
# Carousels
# ---------------------------------------------------------------------------
[carousel]
card_width = 280       # px
gap = 24               # px
visible_count = 4      # cards visible at once
container_width = 1200 # px, reference width for the pre-rendered layout
auto_scroll_ms = 5000  # 0 disables auto-scrolling

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
surface = "#f4f7fb"
text = "#1b1f24"
text_muted = "#5f6b7a"
accent = "#054365"
border = "#dde3ea"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0e1217"
surface = "#161c24"
text = "#e8edf2"
text_muted = "#9aa7b5"
accent = "#6fb7e0"
border = "#2a3340"
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-surface: {light_surface};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-accent: {light_accent};
    --color-border: {light_border};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-surface: {dark_surface};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-accent: {dark_accent};
        --color-border: {dark_border};
    }}
}}"#,
        light_bg = colors.light.background,
        light_surface = colors.light.surface,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_accent = colors.light.accent,
        light_border = colors.light.border,
        dark_bg = colors.dark.background,
        dark_surface = colors.dark.surface,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_accent = colors.dark.accent,
        dark_border = colors.dark.border,
    )
}

/// Generate CSS custom properties from carousel config.
pub fn generate_carousel_css(carousel: &CarouselConfig) -> String {
    format!(
        r#":root {{
    --card-width: {card}px;
    --card-gap: {gap}px;
}}"#,
        card = carousel.card_width,
        gap = carousel.gap,
    )
}
