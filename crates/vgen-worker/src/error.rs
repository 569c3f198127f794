//! Worker error types.

use thiserror::Error;
use vgen_client::ClientError;
use vgen_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// What the caller should offer the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Add balance, then resubmit
    TopUp,
    /// Same request may succeed later
    Retry,
    /// Change the prompt or inputs before resubmitting
    Revise,
    /// Nothing the user can do
    Abandon,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Rendering service rejected the request (code {code}): {message}")]
    RemoteRejected { code: i64, message: String },

    #[error("Malformed response from rendering service: {0}")]
    MalformedResponse(String),

    #[error("Generation job failed (flag {code}): {message}")]
    JobFailed { code: i64, message: String },

    #[error("Job {job_id} still running after {elapsed_secs}s")]
    PollTimedOut { job_id: String, elapsed_secs: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::InsufficientBalance(msg.into())
    }

    pub fn remote_rejected(code: i64, msg: impl Into<String>) -> Self {
        Self::RemoteRejected {
            code,
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::PollTimedOut { .. } | WorkerError::JobFailed { .. } => true,
            WorkerError::Client(e) => e.is_retryable(),
            WorkerError::DownloadFailed(_) => true,
            _ => false,
        }
    }

    /// Check if error is a balance problem (user action needed).
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, WorkerError::InsufficientBalance(_))
    }

    pub fn remediation(&self) -> Remediation {
        match self {
            WorkerError::InsufficientBalance(_) => Remediation::TopUp,
            WorkerError::RemoteRejected { .. } | WorkerError::InvalidRequest(_) => {
                Remediation::Revise
            }
            WorkerError::MalformedResponse(_) => Remediation::Abandon,
            _ if self.is_retryable() => Remediation::Retry,
            _ => Remediation::Abandon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_per_variant() {
        assert_eq!(
            WorkerError::insufficient_balance("top up").remediation(),
            Remediation::TopUp
        );
        assert_eq!(
            WorkerError::remote_rejected(400, "bad prompt").remediation(),
            Remediation::Revise
        );
        assert_eq!(
            WorkerError::malformed("no job id").remediation(),
            Remediation::Abandon
        );
        assert_eq!(
            WorkerError::PollTimedOut {
                job_id: "j".into(),
                elapsed_secs: 120
            }
            .remediation(),
            Remediation::Retry
        );
        assert_eq!(
            WorkerError::JobFailed {
                code: 3,
                message: "generation failed".into()
            }
            .remediation(),
            Remediation::Retry
        );
    }

    #[test]
    fn test_balance_is_not_retryable() {
        let err = WorkerError::insufficient_balance("credits exhausted");
        assert!(err.is_insufficient_balance());
        assert!(!err.is_retryable());
        assert!(!WorkerError::remote_rejected(500, "x").is_insufficient_balance());
    }

    #[test]
    fn test_client_retryability_passes_through() {
        assert!(WorkerError::Client(ClientError::ServiceUnavailable("down".into())).is_retryable());
        assert!(!WorkerError::Client(ClientError::Http {
            status: 400,
            body: String::new()
        })
        .is_retryable());
    }
}
