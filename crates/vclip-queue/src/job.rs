//! Job payload and scheduling-heap ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vclip_models::{JobId, JobPriority};

/// The one kind of work this queue ever runs: the end-to-end video
/// analysis pipeline for a single URL submission.
///
/// Modeled as a closed enum rather than a boxed closure, for the same
/// reason the provider layer avoids dynamic dispatch: every job this
/// system runs is known at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobKind {
    AnalyzeVideo { url: String, precision: u8 },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::AnalyzeVideo { .. } => "analyze_video",
        }
    }
}

/// A scheduling-heap entry: priority key plus the payload needed to run it.
#[derive(Debug, Clone)]
pub(crate) struct QueuedJob {
    pub job_id: JobId,
    pub session_id: String,
    pub priority: JobPriority,
    pub created_at: DateTime<Utc>,
    pub kind: JobKind,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job_id == other.job_id
    }
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap, so higher priority must compare greater.
        // Ties break FIFO (earlier created_at wins), so the timestamp
        // comparison is reversed to keep the earlier job "greater".
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn queued(priority: JobPriority, created_at: DateTime<Utc>) -> QueuedJob {
        QueuedJob {
            job_id: JobId::new(),
            session_id: "s".to_string(),
            priority,
            created_at,
            kind: JobKind::AnalyzeVideo {
                url: "https://example.com".to_string(),
                precision: 5,
            },
        }
    }

    #[test]
    fn higher_priority_pops_first() {
        let mut heap = BinaryHeap::new();
        let now = Utc::now();
        heap.push(queued(JobPriority::Low, now));
        heap.push(queued(JobPriority::Urgent, now));
        heap.push(queued(JobPriority::Normal, now));

        assert_eq!(heap.pop().unwrap().priority, JobPriority::Urgent);
        assert_eq!(heap.pop().unwrap().priority, JobPriority::Normal);
        assert_eq!(heap.pop().unwrap().priority, JobPriority::Low);
    }

    #[test]
    fn same_priority_breaks_ties_fifo() {
        let mut heap = BinaryHeap::new();
        let now = Utc::now();
        let earlier = queued(JobPriority::Normal, now - chrono::Duration::seconds(5));
        let later = queued(JobPriority::Normal, now);
        let earlier_id = earlier.job_id.clone();

        heap.push(later);
        heap.push(earlier);

        assert_eq!(heap.pop().unwrap().job_id, earlier_id);
    }
}
