//! Per-user workspace session.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ids::SessionId;

/// Lifecycle status of a user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Processing,
    Idle,
    Completed,
    Expired,
}

/// An isolated per-user workspace and its admission bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserSession {
    pub session_id: SessionId,
    /// Hash of `session_id`; kept distinct so the workspace directory
    /// name and the user-identity value can diverge later.
    pub user_id: String,
    pub workspace_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub active_tasks: u32,
    pub status: SessionStatus,
}

impl UserSession {
    pub fn new(session_id: SessionId, workspace_dir: PathBuf) -> Self {
        let now = Utc::now();
        let user_id = format!("{:x}", md5_like_hash(session_id.as_str()));
        Self {
            session_id,
            user_id,
            workspace_dir,
            created_at: now,
            last_active: now,
            active_tasks: 0,
            status: SessionStatus::Active,
        }
    }

    /// Reclaimable when idle for at least `idle_after` and no active tasks.
    pub fn is_reclaimable(&self, idle_after: chrono::Duration) -> bool {
        self.active_tasks == 0 && Utc::now() - self.last_active >= idle_after
    }
}

/// Cheap, non-cryptographic fold used only to derive a stable display
/// id from a session id; not a security boundary.
fn md5_like_hash(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclaimable_requires_idle_and_no_tasks() {
        let mut s = UserSession::new(SessionId::new(), PathBuf::from("/tmp/x"));
        assert!(!s.is_reclaimable(chrono::Duration::seconds(0)) || s.active_tasks == 0);
        s.active_tasks = 1;
        assert!(!s.is_reclaimable(chrono::Duration::zero()));
        s.active_tasks = 0;
        s.last_active = Utc::now() - chrono::Duration::minutes(10);
        assert!(s.is_reclaimable(chrono::Duration::minutes(5)));
    }
}
