//! Import sessions
//!
//! A preview parks its parsed departments in a session so the execute step
//! does not need the file again. Sessions live for [`SESSION_TTL_MINUTES`] and are
//! purged by [`spawn_session_sweeper`].

use async_trait::async_trait;
use celsched_common::models::{LogMetadata, LogType, MetaKey, Severity};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::DepartmentPreview;
use crate::audit::AuditLogger;

/// How long a preview stays executable, in minutes
pub const SESSION_TTL_MINUTES: i64 = 30;

/// How often expired sessions are purged
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Parsed spreadsheet waiting for execute
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSession {
    pub id: Uuid,
    pub departments: Vec<DepartmentPreview>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ImportSession {
    pub fn new(departments: Vec<DepartmentPreview>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            departments,
            created_at: now,
            expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage for import sessions
///
/// Expired sessions are never returned, even before a sweep removes them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: ImportSession);

    async fn get(&self, id: Uuid) -> Option<ImportSession>;

    /// Remove and return a live session
    async fn remove(&self, id: Uuid) -> Option<ImportSession>;

    /// Drop every expired session, returning how many were dropped
    async fn sweep_expired(&self) -> usize;
}

/// Process-local session map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, ImportSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: ImportSession) {
        self.sessions.write().await.insert(session.id, session);
    }

    async fn get(&self, id: Uuid) -> Option<ImportSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|s| !s.is_expired_at(Utc::now()))
            .cloned()
    }

    async fn remove(&self, id: Uuid) -> Option<ImportSession> {
        let session = self.sessions.write().await.remove(&id)?;
        (!session.is_expired_at(Utc::now())).then_some(session)
    }

    async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }
}

/// Periodically purge expired sessions
///
/// The first sweep happens one full interval after spawning.
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    audit: AuditLogger,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let purged = sessions.sweep_expired().await;
            if purged == 0 {
                debug!("Session sweep: nothing expired");
                continue;
            }

            info!(purged, "Purged expired import sessions");
            audit
                .record(
                    LogType::SessionSweep,
                    Severity::Info,
                    LogMetadata::new().with(MetaKey::RecordCount, purged),
                )
                .await;
        }
    })
}
