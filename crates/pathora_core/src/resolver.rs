//! crates/pathora_core/src/resolver.rs
//!
//! Turns model-suggested resources into categorized resources with a usable URL.
//!
//! Suggested URLs are untrusted. The policy, first match wins:
//! 1. a `SEARCH:` sentinel is a query for the video or web search provider;
//! 2. an implausible URL is replaced by a search on the resource title;
//! 3. a bare host/path gets an `https://` scheme;
//! 4. anything else is used as-is.
//!
//! When a search fails or finds nothing, the provider's public results page for
//! the query is used instead. Resolution never fails.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::domain::{LessonId, RawResource, ResolvedResource, ResourceCategory};
use crate::ports::SearchService;

/// Number of hits requested from a search provider; only the first is used.
const SEARCH_RESULT_LIMIT: u32 = 1;

/// Suggested URLs shorter than this are never real links.
const MIN_URL_LEN: usize = 10;

/// Domains models use when they make a link up.
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "placeholder.com",
    "yourdomain.com",
    "yoursite.com",
    "your-link",
    "link-to-",
];

static SENTINEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*search\s*:").expect("sentinel pattern is valid"));

//=========================================================================================
// Pure Policy
//=========================================================================================

/// Which search provider a query goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    Video,
    Web,
}

impl SearchProvider {
    fn for_kind(kind: &str) -> Self {
        if kind.to_lowercase().contains("video") {
            SearchProvider::Video
        } else {
            SearchProvider::Web
        }
    }

    /// The provider's public results page for `query`.
    pub fn results_page(self, query: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        match self {
            SearchProvider::Video => {
                format!("https://www.youtube.com/results?search_query={}", encoded)
            }
            SearchProvider::Web => format!("https://www.google.com/search?q={}", encoded),
        }
    }
}

/// The outcome of applying the URL policy to a suggestion, before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    Search {
        query: String,
        provider: SearchProvider,
    },
    Direct(String),
}

/// Maps a free-text resource type onto the closed category set.
pub fn classify(kind: &str) -> ResourceCategory {
    let kind = kind.to_lowercase();
    if kind.contains("video") {
        ResourceCategory::VideoCourses
    } else if kind.contains("practice") || kind.contains("code") {
        ResourceCategory::PracticePlatforms
    } else {
        ResourceCategory::ArticlesAndTutorials
    }
}

/// Heuristic plausibility check for a suggested URL.
pub fn is_plausible_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    url.chars().count() >= MIN_URL_LEN
        && !url.contains(' ')
        && url.contains('.')
        && !PLACEHOLDER_DOMAINS.iter().any(|d| lowered.contains(d))
}

fn has_http_scheme(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Lowercases the scheme of a URL already known to carry one.
fn normalize_scheme(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{}://{}", scheme.to_ascii_lowercase(), rest),
        None => url.to_string(),
    }
}

pub fn plan(raw: &RawResource) -> ResolutionPlan {
    let url = raw.url.trim();
    let provider = SearchProvider::for_kind(&raw.kind);

    if let Some(found) = SENTINEL.find(url) {
        let query = url[found.end()..].trim();
        let query = if query.is_empty() { raw.title.trim() } else { query };
        return ResolutionPlan::Search {
            query: query.to_string(),
            provider,
        };
    }
    // Any scheme other than http(s) is treated like a made-up link.
    if !is_plausible_url(url) || (url.contains("://") && !has_http_scheme(url)) {
        return ResolutionPlan::Search {
            query: raw.title.trim().to_string(),
            provider,
        };
    }
    if !has_http_scheme(url) {
        return ResolutionPlan::Direct(format!("https://{}", url));
    }
    ResolutionPlan::Direct(normalize_scheme(url))
}

fn describe(raw: &RawResource, category: ResourceCategory) -> String {
    let kind = raw.kind.trim();
    let kind = if kind.is_empty() {
        category.label().to_lowercase()
    } else {
        kind.to_lowercase()
    };
    match raw.duration.as_deref().map(str::trim) {
        Some(duration) if !duration.is_empty() => {
            format!("AI-recommended {} ({})", kind, duration)
        }
        _ => format!("AI-recommended {}", kind),
    }
}

fn build(
    raw: &RawResource,
    final_url: String,
    synthetic_id: i64,
    lesson_id: Option<LessonId>,
) -> ResolvedResource {
    let category = classify(&raw.kind);
    ResolvedResource {
        synthetic_id,
        title: raw.title.trim().to_string(),
        kind: raw.kind.clone(),
        description: describe(raw, category),
        category,
        final_url,
        suggested_url: raw.url.clone(),
        duration: raw.duration.clone(),
        icon: category.icon(),
        lesson_id,
    }
}

/// Resolves without contacting any provider: searches go straight to the
/// results page. Used when re-reading stored resources.
pub fn resolve_offline(
    raw: &RawResource,
    synthetic_id: i64,
    lesson_id: Option<LessonId>,
) -> ResolvedResource {
    let final_url = match plan(raw) {
        ResolutionPlan::Direct(url) => url,
        ResolutionPlan::Search { query, provider } => provider.results_page(&query),
    };
    build(raw, final_url, synthetic_id, lesson_id)
}

//=========================================================================================
// Synthetic Identifiers
//=========================================================================================

/// Hands out -1, -2, ... for the resources of one response.
#[derive(Debug)]
pub struct SyntheticIds {
    next: i64,
}

impl SyntheticIds {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    pub fn allocate(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }
}

impl Default for SyntheticIds {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// The Resolver
//=========================================================================================

/// Resolves suggestions, consulting the search providers when the policy asks for it.
#[derive(Clone)]
pub struct ResourceResolver {
    video_search: Arc<dyn SearchService>,
    web_search: Arc<dyn SearchService>,
}

impl ResourceResolver {
    pub fn new(video_search: Arc<dyn SearchService>, web_search: Arc<dyn SearchService>) -> Self {
        Self {
            video_search,
            web_search,
        }
    }

    pub async fn resolve(
        &self,
        raw: &RawResource,
        ids: &mut SyntheticIds,
        lesson_id: Option<LessonId>,
    ) -> ResolvedResource {
        let final_url = match plan(raw) {
            ResolutionPlan::Direct(url) => url,
            ResolutionPlan::Search { query, provider } => {
                match self.first_link(provider, &query).await {
                    Some(link) => link,
                    None => provider.results_page(&query),
                }
            }
        };
        build(raw, final_url, ids.allocate(), lesson_id)
    }

    /// Resolves every suggestion in array order.
    pub async fn resolve_all(
        &self,
        raws: &[RawResource],
        lesson_id: Option<LessonId>,
    ) -> Vec<ResolvedResource> {
        let mut ids = SyntheticIds::new();
        let mut resolved = Vec::with_capacity(raws.len());
        for raw in raws {
            resolved.push(self.resolve(raw, &mut ids, lesson_id).await);
        }
        resolved
    }

    async fn first_link(&self, provider: SearchProvider, query: &str) -> Option<String> {
        if query.is_empty() {
            return None;
        }
        let service = match provider {
            SearchProvider::Video => &self.video_search,
            SearchProvider::Web => &self.web_search,
        };
        match service.search(query, SEARCH_RESULT_LIMIT).await {
            Ok(hits) => {
                let link = hits
                    .into_iter()
                    .map(|hit| hit.link.trim().to_string())
                    .find(|link| has_http_scheme(link) && is_plausible_url(link))
                    .map(|link| normalize_scheme(&link));
                if link.is_none() {
                    debug!("{:?} search for '{}' found no usable link", provider, query);
                }
                link
            }
            Err(e) => {
                warn!("{:?} search for '{}' failed, using results page: {}", provider, query, e);
                None
            }
        }
    }
}
