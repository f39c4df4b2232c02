//! Per-user session lifecycle and workspace isolation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use vclip_models::{SessionId, SessionStatus, UserSession};

use crate::error::{SessionError, SessionResult};
use crate::resource::ResourceMonitor;

const IDLE_RECLAIM_AFTER: i64 = 300;

pub struct SessionManagerConfig {
    pub max_concurrent_users: usize,
    pub max_concurrent_tasks: u32,
    pub base_workspace: PathBuf,
    /// Delete a session's workspace directory once its pipeline
    /// completes. Disable to keep intermediate frames around for
    /// inspection.
    pub auto_cleanup: bool,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_users: std::env::var("MAX_CONCURRENT_USERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            max_concurrent_tasks: std::env::var("MAX_CONCURRENT_TASKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            base_workspace: std::env::var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/temp")),
            auto_cleanup: std::env::var("AUTO_CLEANUP")
                .ok()
                .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
                .unwrap_or(false),
        }
    }
}

/// Owns every active `UserSession`, the workspace directory tree, and
/// the system resource monitor gating task admission.
pub struct SessionManager {
    config: SessionManagerConfig,
    sessions: Mutex<HashMap<SessionId, UserSession>>,
    resource_monitor: ResourceMonitor,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig) -> SessionResult<Arc<Self>> {
        std::fs::create_dir_all(&config.base_workspace)?;
        Ok(Arc::new(Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            resource_monitor: ResourceMonitor::default(),
        }))
    }

    pub fn from_env() -> SessionResult<Arc<Self>> {
        Self::new(SessionManagerConfig::default())
    }

    pub async fn get_or_create_session(&self) -> SessionResult<UserSession> {
        let mut sessions = self.sessions.lock().await;

        if sessions.len() >= self.config.max_concurrent_users {
            reclaim_idle(&mut sessions);
            if sessions.len() >= self.config.max_concurrent_users {
                return Err(SessionError::CapacityExceeded);
            }
        }

        let session_id = SessionId::new();
        let workspace_dir = self.config.base_workspace.join(session_id.as_str());
        std::fs::create_dir_all(&workspace_dir)?;

        let session = UserSession::new(session_id.clone(), workspace_dir);
        tracing::info!(session_id = %session_id, total = sessions.len() + 1, "session created");
        sessions.insert(session_id, session.clone());
        Ok(session)
    }

    /// Returns false (do not start) without mutating session state when
    /// systemwide capacity or the resource monitor denies admission.
    pub async fn start_task(&self, session_id: &SessionId, task_name: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };

        let total_active: u32 = sessions.values().map(|s| s.active_tasks).sum();
        if total_active >= self.config.max_concurrent_tasks {
            tracing::warn!(task_name, total_active, "task admission denied: capacity");
            return false;
        }

        if !self.resource_monitor.can_start_new_task() {
            return false;
        }

        let session = sessions.get_mut(session_id).expect("checked above");
        session.active_tasks += 1;
        session.status = SessionStatus::Processing;
        session.last_active = chrono::Utc::now();
        true
    }

    pub async fn end_task(&self, session_id: &SessionId, _task_name: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.active_tasks = session.active_tasks.saturating_sub(1);
            if session.active_tasks == 0 {
                session.status = SessionStatus::Idle;
            }
            session.last_active = chrono::Utc::now();
        }
    }

    pub async fn mark_pipeline_completed(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.status = SessionStatus::Completed;
            session.last_active = chrono::Utc::now();
        }
    }

    pub async fn get_workspace_path(
        &self,
        session_id: &SessionId,
        subdirectory: Option<&str>,
    ) -> SessionResult<PathBuf> {
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let mut path = session.workspace_dir.clone();
        if let Some(sub) = subdirectory {
            path.push(sub);
            std::fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    pub async fn cleanup_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.remove(session_id) {
            if !self.config.auto_cleanup {
                return;
            }
            if let Err(err) = std::fs::remove_dir_all(&session.workspace_dir) {
                tracing::error!(session_id = %session_id, %err, "workspace cleanup failed");
            }
        }
    }

    /// Background idle sweep; run from a `tokio::spawn`ed loop owned by
    /// the binary, not a detached daemon thread.
    pub async fn reap_idle_sessions(&self) {
        let mut sessions = self.sessions.lock().await;
        reclaim_idle(&mut sessions);
    }
}

fn reclaim_idle(sessions: &mut HashMap<SessionId, UserSession>) {
    let idle_after = Duration::seconds(IDLE_RECLAIM_AFTER);
    let expired: Vec<SessionId> = sessions
        .iter()
        .filter(|(_, s)| s.is_reclaimable(idle_after))
        .map(|(id, _)| id.clone())
        .collect();

    for session_id in expired {
        if let Some(session) = sessions.remove(&session_id) {
            if let Err(err) = std::fs::remove_dir_all(&session.workspace_dir) {
                tracing::error!(%session_id, %err, "idle workspace cleanup failed");
            }
            tracing::info!(%session_id, "reclaimed idle session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: PathBuf) -> SessionManagerConfig {
        SessionManagerConfig {
            max_concurrent_users: 2,
            max_concurrent_tasks: 1,
            base_workspace: base,
            auto_cleanup: false,
        }
    }

    #[tokio::test]
    async fn capacity_exceeded_when_no_session_reclaimable() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::new(config(dir.path().to_path_buf())).unwrap();

        let s1 = mgr.get_or_create_session().await.unwrap();
        mgr.start_task(&s1.session_id, "t").await;
        let _s2 = mgr.get_or_create_session().await.unwrap();

        assert!(matches!(
            mgr.get_or_create_session().await,
            Err(SessionError::CapacityExceeded)
        ));
    }

    #[tokio::test]
    async fn task_admission_respects_systemwide_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::new(config(dir.path().to_path_buf())).unwrap();

        let s1 = mgr.get_or_create_session().await.unwrap();
        assert!(mgr.start_task(&s1.session_id, "a").await);
        assert!(!mgr.start_task(&s1.session_id, "b").await);

        mgr.end_task(&s1.session_id, "a").await;
        assert!(mgr.start_task(&s1.session_id, "c").await);
    }

    #[tokio::test]
    async fn cleanup_removes_workspace_directory_when_auto_cleanup_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path().to_path_buf());
        cfg.auto_cleanup = true;
        let mgr = SessionManager::new(cfg).unwrap();
        let session = mgr.get_or_create_session().await.unwrap();
        assert!(session.workspace_dir.exists());

        mgr.cleanup_session(&session.session_id).await;
        assert!(!session.workspace_dir.exists());
    }

    #[tokio::test]
    async fn cleanup_keeps_workspace_directory_when_auto_cleanup_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::new(config(dir.path().to_path_buf())).unwrap();
        let session = mgr.get_or_create_session().await.unwrap();
        assert!(session.workspace_dir.exists());

        mgr.cleanup_session(&session.session_id).await;
        assert!(session.workspace_dir.exists());
    }
}
