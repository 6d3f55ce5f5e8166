use async_trait::async_trait;
use chrono::{DateTime, Utc};
use komon_core::{Content, Event, KomonError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    /// Contents of every complete event, oldest first.
    pub fn conversation_history(&self) -> Vec<Content> {
        self.events
            .iter()
            .filter(|e| !e.is_partial())
            .filter_map(|e| e.content().cloned())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub app_name: String,
    pub user_id: String,
    /// Generated when `None`.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create(&self, req: CreateRequest) -> Result<Session>;
    async fn get(&self, req: GetRequest) -> Result<Session>;
    async fn append_event(&self, req: GetRequest, event: Event) -> Result<()>;
    async fn delete(&self, req: GetRequest) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl From<&GetRequest> for SessionKey {
    fn from(req: &GetRequest) -> Self {
        Self {
            app_name: req.app_name.clone(),
            user_id: req.user_id.clone(),
            session_id: req.session_id.clone(),
        }
    }
}

#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Arc<RwLock<HashMap<SessionKey, Session>>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> KomonError {
    KomonError::Session("session store lock poisoned".to_string())
}

fn not_found(key: &SessionKey) -> KomonError {
    KomonError::Session(format!(
        "session not found: {}/{}/{}",
        key.app_name, key.user_id, key.session_id
    ))
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(&self, req: CreateRequest) -> Result<Session> {
        let session_id = req.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = SessionKey {
            app_name: req.app_name.clone(),
            user_id: req.user_id.clone(),
            session_id: session_id.clone(),
        };

        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if sessions.contains_key(&key) {
            return Err(KomonError::Session(format!("session already exists: {}", session_id)));
        }

        let session = Session {
            id: session_id,
            app_name: req.app_name,
            user_id: req.user_id,
            events: Vec::new(),
            last_update_time: Utc::now(),
        };
        sessions.insert(key, session.clone());
        tracing::debug!(session.id = %session.id, "session created");
        Ok(session)
    }

    async fn get(&self, req: GetRequest) -> Result<Session> {
        let key = SessionKey::from(&req);
        let sessions = self.sessions.read().map_err(poisoned)?;
        sessions.get(&key).cloned().ok_or_else(|| not_found(&key))
    }

    async fn append_event(&self, req: GetRequest, event: Event) -> Result<()> {
        let key = SessionKey::from(&req);
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let session = sessions.get_mut(&key).ok_or_else(|| not_found(&key))?;
        session.last_update_time = event.timestamp;
        session.events.push(event);
        Ok(())
    }

    async fn delete(&self, req: GetRequest) -> Result<()> {
        let key = SessionKey::from(&req);
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(&key);
        Ok(())
    }
}
