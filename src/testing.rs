//! Test fixtures: an in-process AppState, a recording notifier, a scripted store and
//! request helpers.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use crate::app::build_router;
use crate::config::Config;
use crate::repos::document::{Document, Filter, FindOptions, Group, Pipeline, TransitionResult, Update};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::memory::MemoryStore;
use crate::repos::store::DocumentStore;
use crate::repos::user_repo;
use crate::services::auth::{Role, TokenService};
use crate::services::cache::MemoryCache;
use crate::services::content::{
    GenerationContext, GeneratorError, ResourceGenerator, ResourceItem, ResourceSet,
};
use crate::services::notify::{DeliveryReport, Notifier, NotifyError, OutboundMessage};
use crate::services::record_id::RecordId;
use crate::state::{AppState, OtpSettings};

pub const SECRET: &str = "test-secret";
pub const ISSUER: &str = "tutor-api";

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
    refuse: bool,
}

impl RecordingNotifier {
    pub fn refusing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            refuse: true,
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Six-digit code from the most recent message to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.recipient == email)
            .and_then(|m| {
                m.body
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|w| w.len() == 6)
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReport, NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(DeliveryReport {
            success: !self.refuse,
            details: if self.refuse { "refused" } else { "ok" }.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct FixedGenerator;

#[async_trait]
impl ResourceGenerator for FixedGenerator {
    fn backend_name(&self) -> &'static str {
        "fixed"
    }

    async fn generate(
        &self,
        _content: &str,
        context: &GenerationContext,
    ) -> Result<ResourceSet, GeneratorError> {
        let mut set = ResourceSet::new();
        set.insert(
            "reading".to_string(),
            vec![
                ResourceItem {
                    title: format!("{} primer", context.course_title),
                    url: "https://example.com/primer".to_string(),
                    description: String::new(),
                },
                ResourceItem {
                    title: "broken".to_string(),
                    url: "not a url".to_string(),
                    description: String::new(),
                },
            ],
        );
        Ok(set)
    }
}

/// Memory store that fails inserts into some collections and hides others from
/// `find_one`, to stage store errors and check-then-insert races.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    refuse_inserts: Vec<&'static str>,
    hide_lookups: Vec<&'static str>,
}

impl ScriptedStore {
    pub fn refusing_inserts(collection: &'static str) -> Self {
        Self {
            refuse_inserts: vec![collection],
            ..Self::default()
        }
    }

    pub fn hiding_lookups(collection: &'static str) -> Self {
        Self {
            hide_lookups: vec![collection],
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn find_one(&self, filter: &Filter) -> RepoResult<Option<Document>> {
        if self.hide_lookups.contains(&filter.collection) {
            return Ok(None);
        }
        self.inner.find_one(filter).await
    }

    async fn find_many(&self, filter: &Filter, options: &FindOptions) -> RepoResult<Vec<Document>> {
        self.inner.find_many(filter, options).await
    }

    async fn insert_one(&self, collection: &'static str, doc: Document) -> RepoResult<RecordId> {
        if self.refuse_inserts.contains(&collection) {
            return Err(RepoError::Timeout(Duration::from_secs(5)));
        }
        self.inner.insert_one(collection, doc).await
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> RepoResult<TransitionResult> {
        self.inner.update_one(filter, update).await
    }

    async fn delete_many(&self, filter: &Filter) -> RepoResult<u64> {
        self.inner.delete_many(filter).await
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> RepoResult<Vec<Group>> {
        self.inner.aggregate(pipeline).await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(Arc::new(MemoryStore::new()), notifier)
    }

    pub fn with_store(store: impl DocumentStore) -> Self {
        Self::build(Arc::new(store), RecordingNotifier::default())
    }

    fn build(store: Arc<dyn DocumentStore>, notifier: RecordingNotifier) -> Self {
        let notifier = Arc::new(notifier);
        let state = AppState {
            store,
            tokens: Arc::new(TokenService::new(SECRET, ISSUER, 3600, 0)),
            cache: Arc::new(MemoryCache::new()),
            generator: Arc::new(FixedGenerator),
            notifier: notifier.clone(),
            otp: OtpSettings {
                ttl: Duration::from_secs(600),
                resend_interval: Duration::from_secs(60),
            },
        };
        let router = build_router(state.clone(), &test_config());
        Self {
            state,
            notifier,
            router,
        }
    }

    /// Create a user and mint an access token for them.
    pub async fn user(&self, email: &str, role: Role) -> (RecordId, String) {
        let user = user_repo::create(self.state.store.as_ref(), "Test User", email, role, Utc::now())
            .await
            .unwrap();
        let token = self.state.tokens.issue(&user.id, role).unwrap().token;
        (user.id, token)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

pub fn test_config() -> Config {
    Config::from_vars(|key| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap()
}
