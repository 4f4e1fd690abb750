//! Stage 1: fetch every collection the site needs into one snapshot.
//!
//! The snapshot is the raw material of a build: one [`Envelope`] per CMS
//! collection, one per menu for that menu's articles and banners, plus the
//! course search and forum topics from the learning platform. Nothing is
//! filtered here (the resolve stage does that) so `snapshot.json` shows
//! exactly what the upstream APIs answered, failures included.
//!
//! ## Ordering
//!
//! Menus are fetched first, on their own, because the per-menu article and
//! banner fetches are keyed by menu slug. Everything else is independent and
//! runs in parallel on the rayon pool.
//!
//! ## Strict mode
//!
//! By default a failed fetch is recorded in its envelope and the build goes
//! on; the affected section renders its "unable to load" state. With
//! `strict`, the first failure cancels the shared [`CancelToken`]: fetches
//! not yet sent are skipped, responses still in flight are discarded, and
//! [`fetch_snapshot`] returns [`SnapshotError::Strict`].

use crate::cms::{CmsClient, Collection, CollectionQuery};
use crate::config::{Endpoints, SiteConfig};
use crate::fetch::{CancelToken, Envelope, Transport};
use crate::lms::{LmsClient, SearchRequest, SearchResult, Topic};
use crate::resolve::{VisibilityRules, resolve_values};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{source_name} failed in strict mode: {message}")]
    Strict {
        source_name: String,
        message: String,
    },
}

type Records = Envelope<Vec<Value>>;

fn empty() -> Records {
    Envelope::ok(Vec::new(), 200)
}

/// Raw upstream answers for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub endpoints: Endpoints,
    pub fetched_at: DateTime<Utc>,
    pub menus: Records,
    pub articles: Records,
    pub banners: Records,
    pub contacts: Records,
    pub social_links: Records,
    pub media: Records,
    pub partners: Records,
    pub sliders: Records,
    /// Articles per menu slug, fetched with `menu={slug}&state=Published`.
    #[serde(default)]
    pub menu_articles: BTreeMap<String, Records>,
    /// Banners per menu slug.
    #[serde(default)]
    pub menu_banners: BTreeMap<String, Records>,
    pub courses: Envelope<SearchResult>,
    pub popular_topics: Envelope<Vec<Topic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_topics: Option<Envelope<Vec<Topic>>>,
}

impl Snapshot {
    /// A snapshot where every source answered with nothing.
    pub fn new(endpoints: Endpoints, fetched_at: DateTime<Utc>) -> Self {
        Self {
            endpoints,
            fetched_at,
            menus: empty(),
            articles: empty(),
            banners: empty(),
            contacts: empty(),
            social_links: empty(),
            media: empty(),
            partners: empty(),
            sliders: empty(),
            menu_articles: BTreeMap::new(),
            menu_banners: BTreeMap::new(),
            courses: Envelope::ok(SearchResult::default(), 200),
            popular_topics: Envelope::ok(Vec::new(), 200),
            domain_topics: None,
        }
    }

    pub fn collection(&self, collection: Collection) -> &Records {
        match collection {
            Collection::Articles => &self.articles,
            Collection::Banners => &self.banners,
            Collection::Contacts => &self.contacts,
            Collection::SocialLinks => &self.social_links,
            Collection::Menus => &self.menus,
            Collection::Media => &self.media,
            Collection::Partners => &self.partners,
            Collection::Sliders => &self.sliders,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Records {
        match collection {
            Collection::Articles => &mut self.articles,
            Collection::Banners => &mut self.banners,
            Collection::Contacts => &mut self.contacts,
            Collection::SocialLinks => &mut self.social_links,
            Collection::Menus => &mut self.menus,
            Collection::Media => &mut self.media,
            Collection::Partners => &mut self.partners,
            Collection::Sliders => &mut self.sliders,
        }
    }

    /// `(source name, error)` for every failed envelope.
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut note = |name: String, success: bool, error: &Option<String>| {
            if !success {
                out.push((name, error.clone().unwrap_or_default()));
            }
        };
        for collection in Collection::ALL {
            let env = self.collection(collection);
            note(collection.to_string(), env.success, &env.error);
        }
        for (slug, env) in &self.menu_articles {
            note(format!("articles[{slug}]"), env.success, &env.error);
        }
        for (slug, env) in &self.menu_banners {
            note(format!("banners[{slug}]"), env.success, &env.error);
        }
        note("courses".into(), self.courses.success, &self.courses.error);
        note(
            "popular topics".into(),
            self.popular_topics.success,
            &self.popular_topics.error,
        );
        if let Some(env) = &self.domain_topics {
            note("domain topics".into(), env.success, &env.error);
        }
        out
    }
}

/// Progress report for one completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchEvent {
    pub source_name: String,
    pub status: u16,
    /// Record count on success, error message on failure.
    pub outcome: Result<usize, String>,
}

/// One independent fetch of the parallel phase.
#[derive(Debug, Clone, PartialEq)]
enum Job {
    Collection(Collection),
    MenuArticles(String),
    MenuBanners(String),
    Courses,
    PopularTopics,
    DomainTopics(String),
}

impl Job {
    fn name(&self) -> String {
        match self {
            Job::Collection(c) => c.to_string(),
            Job::MenuArticles(slug) => format!("articles[{slug}]"),
            Job::MenuBanners(slug) => format!("banners[{slug}]"),
            Job::Courses => "courses".to_string(),
            Job::PopularTopics => "popular topics".to_string(),
            Job::DomainTopics(_) => "domain topics".to_string(),
        }
    }
}

enum Outcome {
    Records(Job, Records),
    Courses(Envelope<SearchResult>),
    Topics(Job, Envelope<Vec<Topic>>),
}

/// Shared state of one fetch run.
struct Run<'a, T: Transport> {
    transport: &'a T,
    endpoints: &'a Endpoints,
    config: &'a SiteConfig,
    cancel: CancelToken,
    strict: bool,
    first_failure: Mutex<Option<(String, String)>>,
    events: Option<Mutex<Sender<FetchEvent>>>,
}

impl<T: Transport> Run<'_, T> {
    fn cms(&self) -> CmsClient<'_, T> {
        CmsClient::new(self.transport, &self.endpoints.cms, &self.cancel)
    }

    fn lms(&self) -> LmsClient<'_, T> {
        LmsClient::new(self.transport, &self.endpoints.nulp, &self.cancel)
    }

    /// Record a finished fetch: report it, and in strict mode cancel the run
    /// on the first failure.
    fn finish<D>(&self, name: String, env: &Envelope<D>, count: impl Fn(&D) -> usize) {
        let outcome = match (&env.data, env.success) {
            (Some(data), true) => Ok(count(data)),
            _ => Err(env.error.clone().unwrap_or_default()),
        };
        if let (Err(message), true) = (&outcome, self.strict) {
            if let Ok(mut first) = self.first_failure.lock() {
                first.get_or_insert_with(|| (name.clone(), message.clone()));
            }
            self.cancel.cancel();
        }
        if let Some(tx) = self.events.as_ref().and_then(|m| m.lock().ok()) {
            tx.send(FetchEvent {
                source_name: name,
                status: env.status,
                outcome,
            })
            .ok();
        }
    }

    fn run(&self, job: Job) -> Outcome {
        let name = job.name();
        match job {
            Job::Collection(collection) => {
                let env = self.cms().collection(collection, &CollectionQuery::new());
                self.finish(name, &env, Vec::len);
                Outcome::Records(job, env)
            }
            Job::MenuArticles(ref slug) => {
                let query = CollectionQuery::new().menu(slug).param("state", "Published");
                let env = self.cms().collection(Collection::Articles, &query);
                self.finish(name, &env, Vec::len);
                Outcome::Records(job, env)
            }
            Job::MenuBanners(ref slug) => {
                let query = CollectionQuery::new().menu(slug);
                let env = self.cms().collection(Collection::Banners, &query);
                self.finish(name, &env, Vec::len);
                Outcome::Records(job, env)
            }
            Job::Courses => {
                let sections = &self.config.sections;
                let request = SearchRequest::courses(
                    &sections.course_categories,
                    sections.course_limit as usize,
                );
                let env = self.lms().search(&request);
                self.finish(name, &env, |r| r.content.len());
                Outcome::Courses(env)
            }
            Job::PopularTopics => {
                let env = self.lms().popular_topics();
                self.finish(name, &env, Vec::len);
                Outcome::Topics(job, env)
            }
            Job::DomainTopics(ref domain) => {
                let env = self.lms().topics_by_domain(domain);
                self.finish(name, &env, Vec::len);
                Outcome::Topics(job, env)
            }
        }
    }
}

/// Slugs of the menus that will get a content page: published, active,
/// inside their window.
pub fn menu_slugs(menus: &Records, now: DateTime<Utc>) -> Vec<String> {
    let Some(values) = menus.data.as_deref() else {
        return Vec::new();
    };
    let mut slugs: Vec<String> = resolve_values(values, &VisibilityRules::published(), now)
        .iter()
        .map(|item| item.slug.trim().to_string())
        .filter(|slug| !slug.is_empty())
        .collect();
    let mut seen = std::collections::HashSet::new();
    slugs.retain(|slug| seen.insert(slug.clone()));
    slugs
}

/// Fetch everything a build needs.
///
/// `now` picks which menus are live and is stored as the snapshot's fetch
/// time. Progress is reported on `events` as each fetch completes.
pub fn fetch_snapshot(
    transport: &impl Transport,
    endpoints: &Endpoints,
    config: &SiteConfig,
    now: DateTime<Utc>,
    strict: bool,
    events: Option<Sender<FetchEvent>>,
) -> Result<Snapshot, SnapshotError> {
    let run = Run {
        transport,
        endpoints,
        config,
        cancel: CancelToken::new(),
        strict,
        first_failure: Mutex::new(None),
        events: events.map(Mutex::new),
    };
    let mut snapshot = Snapshot::new(endpoints.clone(), now);

    if let Outcome::Records(_, menus) = run.run(Job::Collection(Collection::Menus)) {
        snapshot.menus = menus;
    }

    let mut jobs: Vec<Job> = Collection::ALL
        .into_iter()
        .filter(|c| *c != Collection::Menus)
        .map(Job::Collection)
        .collect();
    for slug in menu_slugs(&snapshot.menus, now) {
        jobs.push(Job::MenuArticles(slug.clone()));
        jobs.push(Job::MenuBanners(slug));
    }
    jobs.push(Job::Courses);
    jobs.push(Job::PopularTopics);
    if let Some(domain) = &config.sections.discussion_domain {
        jobs.push(Job::DomainTopics(domain.clone()));
    }
    tracing::debug!(jobs = jobs.len(), environment = %endpoints.environment, "fetching snapshot");

    let outcomes: Vec<Outcome> = jobs.into_par_iter().map(|job| run.run(job)).collect();

    for outcome in outcomes {
        match outcome {
            Outcome::Records(Job::Collection(c), env) => *snapshot.collection_mut(c) = env,
            Outcome::Records(Job::MenuArticles(slug), env) => {
                snapshot.menu_articles.insert(slug, env);
            }
            Outcome::Records(Job::MenuBanners(slug), env) => {
                snapshot.menu_banners.insert(slug, env);
            }
            Outcome::Records(..) => {}
            Outcome::Courses(env) => snapshot.courses = env,
            Outcome::Topics(Job::DomainTopics(_), env) => snapshot.domain_topics = Some(env),
            Outcome::Topics(_, env) => snapshot.popular_topics = env,
        }
    }

    let first_failure = run
        .first_failure
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some((source_name, message)) = first_failure {
        return Err(SnapshotError::Strict {
            source_name,
            message,
        });
    }
    Ok(snapshot)
}

pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::MockTransport;
    use crate::test_helpers::*;
    use serde_json::json;

    fn ok(items: Value) -> Value {
        json!({"success": true, "data": items})
    }

    fn full_transport() -> MockTransport {
        MockTransport::new()
            .respond(
                "/menus",
                200,
                ok(json!([
                    {"slug": "about-us", "state": "Published"},
                    {"slug": "draft-menu", "state": "Draft"},
                    {"slug": "about-us", "state": "Published"}
                ])),
            )
            .respond("/articles", 200, ok(json!([{"slug": "a1"}])))
            .respond("/banners", 200, ok(json!([])))
            .respond("/contacts", 200, ok(json!([{"slug": "c1"}, {"slug": "c2"}])))
            .respond("/social-links", 200, ok(json!([])))
            .respond("/media", 200, ok(json!([])))
            .respond("/partners", 200, ok(json!([])))
            .respond("/sliders", 200, ok(json!([])))
            .respond(
                "/api/content/v1/search",
                200,
                json!({"responseCode": "OK", "result": {"content": [], "count": 0}}),
            )
            .respond("/discussion-forum/api/popular", 200, json!([]))
    }

    #[test]
    fn fetches_every_collection_and_live_menus() {
        let t = full_transport();
        let snapshot = fetch_snapshot(
            &t,
            &staging_endpoints(),
            &SiteConfig::default(),
            fixed_now(),
            false,
            None,
        )
        .unwrap();

        assert_eq!(snapshot.contacts.data.as_ref().unwrap().len(), 2);
        assert_eq!(
            snapshot.menu_articles.keys().collect::<Vec<_>>(),
            vec!["about-us"]
        );
        assert!(snapshot.menu_banners.contains_key("about-us"));
        assert!(snapshot.failures().is_empty());
        assert!(snapshot.domain_topics.is_none());

        let requests = t.get_requests();
        assert!(requests[0].url.ends_with("/menus"));
        let menu_articles = requests
            .iter()
            .find(|r| r.query.iter().any(|(k, v)| k == "menu" && v == "about-us") && r.url.ends_with("/articles"))
            .unwrap();
        assert!(menu_articles
            .query
            .contains(&("state".to_string(), "Published".to_string())));
    }

    #[test]
    fn failures_are_recorded_not_fatal() {
        let t = MockTransport::new()
            .respond("/menus", 200, ok(json!([])))
            .respond("/partners", 500, json!({"error": "boom"}));
        let snapshot = fetch_snapshot(
            &t,
            &staging_endpoints(),
            &SiteConfig::default(),
            fixed_now(),
            false,
            None,
        )
        .unwrap();

        assert!(!snapshot.partners.success);
        assert_eq!(snapshot.partners.status, 500);
        let failed: Vec<String> = snapshot.failures().into_iter().map(|(n, _)| n).collect();
        assert!(failed.contains(&"partners".to_string()));
    }

    #[test]
    fn strict_mode_reports_first_failure() {
        let t = MockTransport::new().fail("/menus", "connection refused");
        let err = fetch_snapshot(
            &t,
            &staging_endpoints(),
            &SiteConfig::default(),
            fixed_now(),
            true,
            None,
        )
        .unwrap_err();
        match err {
            SnapshotError::Strict {
                source_name,
                message,
            } => {
                assert_eq!(source_name, "menus");
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Menus failed first, so nothing else was sent.
        assert_eq!(t.get_requests().len(), 1);
    }

    #[test]
    fn domain_topics_fetched_when_configured() {
        let t = full_transport();
        let mut config = SiteConfig::default();
        config.sections.discussion_domain = Some("water".to_string());
        let snapshot =
            fetch_snapshot(&t, &staging_endpoints(), &config, fixed_now(), false, None).unwrap();
        let topics = snapshot.domain_topics.unwrap();
        assert!(topics.success);
        assert_eq!(topics.data, Some(Vec::new()));
    }

    #[test]
    fn events_reported_per_fetch() {
        let t = full_transport();
        let (tx, rx) = std::sync::mpsc::channel();
        fetch_snapshot(
            &t,
            &staging_endpoints(),
            &SiteConfig::default(),
            fixed_now(),
            false,
            Some(tx),
        )
        .unwrap();
        let events: Vec<FetchEvent> = rx.iter().collect();
        // menus + 7 collections + 2 per live menu + courses + popular topics
        assert_eq!(events.len(), 1 + 7 + 2 + 2);
        let contacts = events.iter().find(|e| e.source_name == "contacts").unwrap();
        assert_eq!(contacts.outcome, Ok(2));
    }

    #[test]
    fn menu_slugs_deduplicated_and_live_only() {
        let menus = Envelope::ok(
            vec![
                json!({"slug": "b", "state": "Published", "displayOrder": 2}),
                json!({"slug": "a", "state": "Published", "displayOrder": 1}),
                json!({"slug": "a", "state": "Published", "displayOrder": 3}),
                json!({"slug": "", "state": "Published"}),
                json!({"slug": "hidden", "state": "Published", "isActive": false}),
            ],
            200,
        );
        assert_eq!(menu_slugs(&menus, fixed_now()), vec!["a", "b"]);
    }

    #[test]
    fn snapshot_survives_disk_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/snapshot.json");
        let snapshot = sample_snapshot();
        save_snapshot(&snapshot, &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }
}
