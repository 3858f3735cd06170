use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::record::ApplicationRecord;

/// Identifier the persistence backend assigns to a stored application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: ApplicationId,
}

/// Failure while handing the finished record to the backend; never discards wizard state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("backend unavailable: {0}")]
    Transport(String),
    #[error("backend rejected the application ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

/// Persistence backend accepting finished applications.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError>;
}
