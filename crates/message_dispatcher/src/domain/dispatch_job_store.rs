use crate::domain::DispatchOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::domain::DomainResult;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchJobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl From<DispatchOutcome> for DispatchJobStatus {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Succeeded => DispatchJobStatus::Succeeded,
            DispatchOutcome::Failed => DispatchJobStatus::Failed,
        }
    }
}

/// Record of one submitted dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchJob {
    pub job_id: String,
    pub owner_id: String,
    pub status: DispatchJobStatus,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Storage for dispatch job status, keyed by job ID
#[async_trait]
pub trait DispatchJobStore: Send + Sync {
    async fn insert_pending(&self, job_id: &str, owner_id: &str) -> DomainResult<()>;

    /// Mark a job finished; unknown (already evicted) jobs are ignored
    async fn record_outcome(&self, job_id: &str, outcome: DispatchOutcome) -> DomainResult<()>;

    async fn get(&self, job_id: &str) -> DomainResult<Option<DispatchJob>>;
}

#[derive(Default)]
struct Jobs {
    by_id: HashMap<String, DispatchJob>,
    insertion_order: VecDeque<String>,
}

/// Bounded in-memory job store; the oldest job is evicted once capacity is reached
pub struct InMemoryDispatchJobStore {
    capacity: usize,
    jobs: RwLock<Jobs>,
}

impl InMemoryDispatchJobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            jobs: RwLock::new(Jobs::default()),
        }
    }
}

#[async_trait]
impl DispatchJobStore for InMemoryDispatchJobStore {
    async fn insert_pending(&self, job_id: &str, owner_id: &str) -> DomainResult<()> {
        let mut jobs = self.jobs.write().await;

        while jobs.by_id.len() >= self.capacity {
            let Some(oldest) = jobs.insertion_order.pop_front() else {
                break;
            };
            jobs.by_id.remove(&oldest);
        }

        let job = DispatchJob {
            job_id: job_id.to_string(),
            owner_id: owner_id.to_string(),
            status: DispatchJobStatus::Pending,
            submitted_at: Utc::now(),
            completed_at: None,
        };
        if jobs.by_id.insert(job_id.to_string(), job).is_none() {
            jobs.insertion_order.push_back(job_id.to_string());
        }
        Ok(())
    }

    async fn record_outcome(&self, job_id: &str, outcome: DispatchOutcome) -> DomainResult<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.by_id.get_mut(job_id) {
            job.status = outcome.into();
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> DomainResult<Option<DispatchJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.by_id.get(job_id).cloned())
    }
}
