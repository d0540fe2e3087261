//! Session-scoped research context.
//!
//! Each session accumulates the user's expertise level and the papers touched
//! by earlier prompts, so later prompts can refer back to them. Callers that
//! do not supply a session id share the [`SessionKey::Default`] context.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Expertise level given to new contexts when none is configured
pub const DEFAULT_EXPERTISE_LEVEL: &str = "intermediate";

/// Key identifying a research context in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Reserved key used when the caller supplies no session id
    Default,
    Session(String),
}

impl SessionKey {
    /// Map an optional session id to a key; empty ids count as missing
    pub fn from_session_id(session_id: Option<&str>) -> Self {
        match session_id {
            Some(id) if !id.is_empty() => SessionKey::Session(id.to_string()),
            _ => SessionKey::Default,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Default => f.write_str("<default>"),
            SessionKey::Session(id) => f.write_str(id),
        }
    }
}

/// Minimal record of a paper seen in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExploredPaper {
    pub id: String,
}

/// Status of a paper analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
}

/// State accumulated across prompt invocations in one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchContext {
    pub expertise_level: String,
    pub explored_papers: BTreeMap<String, ExploredPaper>,
    pub paper_analyses: BTreeMap<String, AnalysisStatus>,
}

impl ResearchContext {
    pub fn new(expertise_level: impl Into<String>) -> Self {
        Self {
            expertise_level: expertise_level.into(),
            explored_papers: BTreeMap::new(),
            paper_analyses: BTreeMap::new(),
        }
    }

    /// Apply the recognized keys of an argument map.
    ///
    /// `expertise_level` overwrites the current level and `paper_id` is added
    /// to the explored papers if it is new. Empty values and unknown keys are
    /// ignored.
    pub fn update_from_arguments(&mut self, args: &HashMap<String, String>) {
        if let Some(level) = non_empty(args, "expertise_level") {
            self.expertise_level = level.to_string();
        }
        if let Some(paper_id) = non_empty(args, "paper_id") {
            self.explored_papers
                .entry(paper_id.to_string())
                .or_insert_with(|| ExploredPaper {
                    id: paper_id.to_string(),
                });
        }
    }

    /// Explored paper ids other than `current`
    pub fn other_explored(&self, current: &str) -> Vec<&str> {
        self.explored_papers
            .keys()
            .map(String::as_str)
            .filter(|id| *id != current)
            .collect()
    }

    pub fn record_analysis(&mut self, paper_id: &str) {
        self.paper_analyses
            .insert(paper_id.to_string(), AnalysisStatus::Complete);
    }
}

impl Default for ResearchContext {
    fn default() -> Self {
        Self::new(DEFAULT_EXPERTISE_LEVEL)
    }
}

/// Look up an argument, treating empty strings as absent
pub(crate) fn non_empty<'a>(args: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    args.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Shared handle to one session's context
pub type ContextHandle = Arc<Mutex<ResearchContext>>;

/// Bounds on how many session contexts the store keeps alive.
///
/// The default context is never evicted. `None` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Most session contexts kept at once; the least recently used goes first
    pub max_sessions: Option<usize>,
    /// Contexts unused for this long are dropped on the next store access
    pub idle_timeout: Option<Duration>,
}

impl SessionLimits {
    pub const UNBOUNDED: Self = Self {
        max_sessions: None,
        idle_timeout: None,
    };
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: Some(DEFAULT_MAX_SESSIONS),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Session contexts kept at once unless configured otherwise
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Idle time after which a session context is dropped unless configured otherwise
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct SessionEntry {
    context: ContextHandle,
    last_used: Instant,
}

/// Store of research contexts keyed by session.
///
/// The outer lock only guards the session map; each context has its own lock
/// so updates in one session never wait on another. Session contexts are
/// dropped once idle past the timeout or when the session cap is reached;
/// both happen lazily on access, with no background task.
#[derive(Debug)]
pub struct ContextStore {
    contexts: Mutex<HashMap<SessionKey, SessionEntry>>,
    default_expertise_level: String,
    limits: SessionLimits,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::with_default_expertise(DEFAULT_EXPERTISE_LEVEL)
    }

    /// Create a store whose new contexts start at the given expertise level
    pub fn with_default_expertise(level: impl Into<String>) -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
            default_expertise_level: level.into(),
            limits: SessionLimits::default(),
        }
    }

    /// Replace the session bounds
    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Get the context for a session, creating it on first use
    pub async fn get_or_create(&self, key: &SessionKey) -> ContextHandle {
        let now = Instant::now();
        let mut contexts = self.contexts.lock().await;
        self.evict_idle(&mut contexts, now);

        if let Some(entry) = contexts.get_mut(key) {
            entry.last_used = now;
            return entry.context.clone();
        }

        if *key != SessionKey::Default {
            self.make_room(&mut contexts);
        }
        tracing::debug!(
            "Creating research context for session {} ({} held)",
            key,
            contexts.len() + 1
        );
        let context = Arc::new(Mutex::new(ResearchContext::new(
            self.default_expertise_level.clone(),
        )));
        contexts.insert(
            key.clone(),
            SessionEntry {
                context: context.clone(),
                last_used: now,
            },
        );
        context
    }

    /// Apply an argument map to a session's context as one atomic update.
    ///
    /// The returned guard keeps the context locked, so the caller can read
    /// or extend the update before any other call on the session sees it.
    pub async fn update(
        &self,
        key: &SessionKey,
        args: &HashMap<String, String>,
    ) -> OwnedMutexGuard<ResearchContext> {
        let mut context = self.get_or_create(key).await.lock_owned().await;
        context.update_from_arguments(args);
        context
    }

    /// Copy of a session's context, if it exists
    pub async fn snapshot(&self, key: &SessionKey) -> Option<ResearchContext> {
        let handle = self.contexts.lock().await.get(key)?.context.clone();
        let context = handle.lock().await;
        Some(context.clone())
    }

    fn evict_idle(&self, contexts: &mut HashMap<SessionKey, SessionEntry>, now: Instant) {
        let Some(timeout) = self.limits.idle_timeout else {
            return;
        };
        contexts.retain(|key, entry| {
            let keep = *key == SessionKey::Default
                || now.saturating_duration_since(entry.last_used) < timeout;
            if !keep {
                tracing::debug!("Dropping idle research context for session {}", key);
            }
            keep
        });
    }

    // Evict least recently used sessions until one more fits under the cap
    fn make_room(&self, contexts: &mut HashMap<SessionKey, SessionEntry>) {
        let Some(max) = self.limits.max_sessions else {
            return;
        };
        loop {
            let held = contexts
                .keys()
                .filter(|key| **key != SessionKey::Default)
                .count();
            if held < max {
                return;
            }
            let oldest = contexts
                .iter()
                .filter(|(key, _)| **key != SessionKey::Default)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!("Session cap reached, dropping research context for {}", key);
                    contexts.remove(&key);
                }
                None => return,
            }
        }
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_session_key_from_id() {
        assert_eq!(SessionKey::from_session_id(None), SessionKey::Default);
        assert_eq!(SessionKey::from_session_id(Some("")), SessionKey::Default);
        assert_eq!(
            SessionKey::from_session_id(Some("s1")),
            SessionKey::Session("s1".to_string())
        );
    }

    #[test]
    fn test_update_recognized_keys() {
        let mut ctx = ResearchContext::default();
        assert_eq!(ctx.expertise_level, "intermediate");

        ctx.update_from_arguments(&args(&[
            ("expertise_level", "expert"),
            ("paper_id", "2401.00001"),
            ("unrelated", "ignored"),
        ]));

        assert_eq!(ctx.expertise_level, "expert");
        assert!(ctx.explored_papers.contains_key("2401.00001"));
        assert_eq!(ctx.explored_papers.len(), 1);
        assert!(ctx.paper_analyses.is_empty());
    }

    #[test]
    fn test_update_empty_map_is_noop() {
        let mut ctx = ResearchContext::default();
        ctx.update_from_arguments(&HashMap::new());
        assert_eq!(ctx, ResearchContext::default());
    }

    #[test]
    fn test_update_ignores_empty_values() {
        let mut ctx = ResearchContext::new("beginner");
        ctx.update_from_arguments(&args(&[("expertise_level", ""), ("paper_id", "")]));
        assert_eq!(ctx.expertise_level, "beginner");
        assert!(ctx.explored_papers.is_empty());
    }

    #[test]
    fn test_explored_papers_unique() {
        let mut ctx = ResearchContext::default();
        ctx.update_from_arguments(&args(&[("paper_id", "A")]));
        ctx.update_from_arguments(&args(&[("paper_id", "B")]));
        ctx.update_from_arguments(&args(&[("paper_id", "A")]));

        assert_eq!(ctx.explored_papers.len(), 2);
        assert_eq!(ctx.other_explored("A"), vec!["B"]);
    }

    #[tokio::test]
    async fn test_store_sessions_are_isolated() {
        let store = ContextStore::new();
        let s1 = SessionKey::Session("s1".to_string());
        let s2 = SessionKey::Session("s2".to_string());

        drop(
            store
                .update(&s1, &args(&[("paper_id", "A"), ("expertise_level", "expert")]))
                .await,
        );
        store.get_or_create(&s2).await;

        let one = store.snapshot(&s1).await.unwrap();
        let two = store.snapshot(&s2).await.unwrap();
        assert!(one.explored_papers.contains_key("A"));
        assert!(two.explored_papers.is_empty());
        assert_eq!(two.expertise_level, "intermediate");
    }

    #[tokio::test]
    async fn test_store_returns_same_context() {
        let store = ContextStore::with_default_expertise("beginner");
        let first = store.get_or_create(&SessionKey::Default).await;
        let second = store.get_or_create(&SessionKey::Default).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.lock().await.expertise_level, "beginner");
    }

    #[tokio::test]
    async fn test_update_holds_lock_until_guard_dropped() {
        let store = ContextStore::new();
        let key = SessionKey::Session("s1".to_string());

        let mut guard = store.update(&key, &args(&[("paper_id", "A")])).await;
        guard.record_analysis("A");
        let handle = store.get_or_create(&key).await;
        assert!(handle.try_lock().is_err());
        drop(guard);

        let ctx = handle.lock().await;
        assert!(ctx.explored_papers.contains_key("A"));
        assert_eq!(ctx.paper_analyses.get("A"), Some(&AnalysisStatus::Complete));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_dropped() {
        let store = ContextStore::new().with_limits(SessionLimits {
            max_sessions: None,
            idle_timeout: Some(Duration::from_secs(60)),
        });
        let idle = SessionKey::Session("idle".to_string());
        let active = SessionKey::Session("active".to_string());

        drop(store.update(&idle, &args(&[("paper_id", "A")])).await);
        drop(store.update(&SessionKey::Default, &args(&[("paper_id", "B")])).await);
        tokio::time::advance(Duration::from_secs(45)).await;
        store.get_or_create(&active).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        // Any access sweeps sessions idle past the timeout
        store.get_or_create(&active).await;
        assert!(store.snapshot(&idle).await.is_none());
        assert!(store.snapshot(&active).await.is_some());
        assert!(store
            .snapshot(&SessionKey::Default)
            .await
            .unwrap()
            .explored_papers
            .contains_key("B"));

        // A returning session starts over
        let ctx = store.get_or_create(&idle).await;
        assert!(ctx.lock().await.explored_papers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cap_drops_least_recently_used() {
        let store = ContextStore::new().with_limits(SessionLimits {
            max_sessions: Some(2),
            idle_timeout: None,
        });
        let key = |id: &str| SessionKey::Session(id.to_string());

        store.get_or_create(&SessionKey::Default).await;
        store.get_or_create(&key("s1")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        store.get_or_create(&key("s2")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        store.get_or_create(&key("s1")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        store.get_or_create(&key("s3")).await;

        assert!(store.snapshot(&key("s2")).await.is_none());
        assert!(store.snapshot(&key("s1")).await.is_some());
        assert!(store.snapshot(&key("s3")).await.is_some());
        assert!(store.snapshot(&SessionKey::Default).await.is_some());
    }

    #[tokio::test]
    async fn test_unbounded_store_keeps_everything() {
        let store = ContextStore::new().with_limits(SessionLimits::UNBOUNDED);
        for i in 0..50 {
            store
                .get_or_create(&SessionKey::Session(format!("s{}", i)))
                .await;
        }
        assert!(store
            .snapshot(&SessionKey::Session("s0".to_string()))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(ContextStore::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let paper = format!("paper-{}", i);
                drop(
                    store
                        .update(&SessionKey::Default, &args(&[("paper_id", paper.as_str())]))
                        .await,
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let ctx = store.snapshot(&SessionKey::Default).await.unwrap();
        assert_eq!(ctx.explored_papers.len(), 32);
    }
}
