//! # nulp-site
//!
//! Static builder for the NULP public website. Content lives in a headless
//! CMS and in the learning platform's search and discussion APIs; this crate
//! pulls it, decides what is visible, and renders the public site as plain
//! HTML.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Each stage writes a JSON file the next stage consumes:
//!
//! ```text
//! 1. Fetch     CMS + LMS   →  snapshot.json   (raw envelopes per source)
//! 2. Resolve   snapshot    →  site.json       (render-ready view models)
//! 3. Generate  site.json   →  dist/           (final HTML site)
//! ```
//!
//! Only the fetch stage talks to the network. Resolve and generate are
//! deterministic given their input file and the `now` used for publish
//! windows, so a saved snapshot can be replayed and inspected.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | Uniform `{success, data, error, status}` envelope over a pluggable HTTP transport |
//! | [`cms`] | Typed requests for the eight CMS collections |
//! | [`lms`] | Content search and discussion forum requests |
//! | [`snapshot`] | Stage 1: parallel fetch of every source into a snapshot |
//! | [`types`] | `ContentItem`, the lenient shape of any CMS record |
//! | [`resolve`] | Visibility rules: state, active flag, category, publish window, stable order |
//! | [`select`] | First match by slug, name, category; two-card split |
//! | [`dom`] | Minimal HTML fragment tree used by the sanitizer and the splitter |
//! | [`sanitize`] | Strips inline `background` declarations from CMS HTML |
//! | [`scroller`] | Carousel position model shared by every carousel |
//! | [`sections`] | Stage 2: per-section rule sets and view models |
//! | [`pages`] | Content pages, one per live menu |
//! | [`generate`] | Stage 3: renders the site with Maud |
//! | [`config`] | `config.toml` loading, validation, endpoint selection, CSS generation |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Failure model
//!
//! A failed fetch never fails the build (unless `--strict`). It is recorded
//! in the snapshot as a failed envelope, the affected section resolves to
//! `Unavailable`, and the page renders without it or with a short notice.

pub mod cms;
pub mod config;
pub mod dom;
pub mod fetch;
pub mod generate;
pub mod lms;
pub mod output;
pub mod pages;
pub mod resolve;
pub mod sanitize;
pub mod scroller;
pub mod sections;
pub mod select;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
