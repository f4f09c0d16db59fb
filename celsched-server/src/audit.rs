//! Audit log writer
//!
//! Writes [`SystemLog`] entries for mutations. A failed write is reported
//! with `warn!` and otherwise ignored, so auditing never changes the outcome
//! of the request that triggered it.

use celsched_common::models::{LogMetadata, LogType, MetaKey, Severity, SystemLog};
use celsched_common::repository::LogRepository;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::auth::Claims;

#[derive(Clone)]
pub struct AuditLogger {
    logs: Arc<dyn LogRepository>,
}

impl AuditLogger {
    pub fn new(logs: Arc<dyn LogRepository>) -> Self {
        Self { logs }
    }

    /// Record an entry made on behalf of an authenticated user
    ///
    /// Adds `userId` and `username` from the caller's token.
    pub async fn record_for(
        &self,
        actor: &Claims,
        log_type: LogType,
        severity: Severity,
        metadata: LogMetadata,
    ) {
        let metadata = metadata
            .with(MetaKey::UserId, actor.user_id.as_str())
            .with(MetaKey::Username, actor.username.as_str());
        self.record(log_type, severity, metadata).await;
    }

    /// Record an entry with no acting user (background tasks)
    pub async fn record(&self, log_type: LogType, severity: Severity, metadata: LogMetadata) {
        let entry = SystemLog::new(log_type, severity, metadata);
        match self.logs.create_log(&entry).await {
            Ok(()) => debug!(log_type = %log_type, id = %entry.id, "Audit entry written"),
            Err(e) => warn!(log_type = %log_type, error = %e, "Failed to write audit entry"),
        }
    }
}
