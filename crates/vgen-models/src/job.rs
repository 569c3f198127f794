//! Remote generation job types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier issued by the rendering service for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a submitted job.
///
/// Immutable once issued; only lives for as long as the job is polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobHandle {
    id: JobId,
    submitted_at: DateTime<Utc>,
}

impl JobHandle {
    /// Issue a handle stamped with the current time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: JobId::from_string(id),
            submitted_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Lifecycle state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Still rendering
    #[default]
    Pending,
    /// Rendered; result locators available
    Succeeded,
    /// Remote service reported a failure
    Failed,
    /// Wall-clock ceiling elapsed before a terminal remote state
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
        }
    }

    /// Check if this is a terminal state (no more transitions).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a successful job: one or more video locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationResult {
    pub job_id: JobId,
    locators: Vec<String>,
}

impl GenerationResult {
    /// Build a result, returning `None` when no non-empty locator is present.
    pub fn new(job_id: JobId, locators: Vec<String>) -> Option<Self> {
        let locators: Vec<String> = locators
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if locators.is_empty() {
            return None;
        }

        Some(Self { job_id, locators })
    }

    pub fn locators(&self) -> &[String] {
        &self.locators
    }

    /// First locator; always present.
    pub fn primary_locator(&self) -> &str {
        &self.locators[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
    }

    #[test]
    fn test_result_requires_locator() {
        let id = JobId::from_string("job-1");
        assert!(GenerationResult::new(id.clone(), vec![]).is_none());
        assert!(GenerationResult::new(id.clone(), vec!["  ".into()]).is_none());

        let result = GenerationResult::new(id, vec!["https://cdn/x.mp4".into()]).unwrap();
        assert_eq!(result.primary_locator(), "https://cdn/x.mp4");
        assert_eq!(result.locators().len(), 1);
    }

    #[test]
    fn test_handle_keeps_id() {
        let handle = JobHandle::new("abc123");
        assert_eq!(handle.id().as_str(), "abc123");
        assert!(handle.submitted_at() <= Utc::now());
    }
}
