use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Document types an applicant can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Cv,
    ProofOfIdentity,
    ProofOfAddress,
    RightToWork,
    QualificationCertificates,
    DbsCertificate,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::Cv,
        DocumentKind::ProofOfIdentity,
        DocumentKind::ProofOfAddress,
        DocumentKind::RightToWork,
        DocumentKind::QualificationCertificates,
        DocumentKind::DbsCertificate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Cv => "CV",
            DocumentKind::ProofOfIdentity => "Proof of identity",
            DocumentKind::ProofOfAddress => "Proof of address",
            DocumentKind::RightToWork => "Right to work",
            DocumentKind::QualificationCertificates => "Qualification certificates",
            DocumentKind::DbsCertificate => "DBS certificate",
        }
    }

    /// Field key used in the serialized record and in error paths.
    pub const fn key(self) -> &'static str {
        match self {
            DocumentKind::Cv => "cv",
            DocumentKind::ProofOfIdentity => "proofOfIdentity",
            DocumentKind::ProofOfAddress => "proofOfAddress",
            DocumentKind::RightToWork => "rightToWork",
            DocumentKind::QualificationCertificates => "qualificationCertificates",
            DocumentKind::DbsCertificate => "dbsCertificate",
        }
    }

    pub const fn is_multi_file(self) -> bool {
        matches!(
            self,
            DocumentKind::ProofOfAddress
                | DocumentKind::RightToWork
                | DocumentKind::QualificationCertificates
        )
    }

    pub const fn is_required(self) -> bool {
        matches!(
            self,
            DocumentKind::Cv
                | DocumentKind::ProofOfIdentity
                | DocumentKind::ProofOfAddress
                | DocumentKind::RightToWork
        )
    }

    pub fn required() -> impl Iterator<Item = DocumentKind> {
        Self::ALL.into_iter().filter(|kind| kind.is_required())
    }
}

/// Handle for an upload that has started but not yet settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UploadTicket(pub u64);

/// Per-wizard bookkeeping of in-flight uploads and the last failure per document kind.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    next_ticket: u64,
    pending: BTreeMap<UploadTicket, DocumentKind>,
    failures: BTreeMap<DocumentKind, String>,
}

impl UploadTracker {
    pub fn begin(&mut self, kind: DocumentKind) -> UploadTicket {
        self.next_ticket += 1;
        let ticket = UploadTicket(self.next_ticket);
        self.pending.insert(ticket, kind);
        ticket
    }

    /// Settle a ticket, returning the kind it was opened for.
    pub fn settle(&mut self, ticket: UploadTicket) -> Option<DocumentKind> {
        self.pending.remove(&ticket)
    }

    pub fn record_failure(&mut self, kind: DocumentKind, message: String) {
        self.failures.insert(kind, message);
    }

    pub fn clear_failure(&mut self, kind: DocumentKind) {
        self.failures.remove(&kind);
    }

    pub fn pending_kinds(&self) -> BTreeSet<DocumentKind> {
        self.pending.values().copied().collect()
    }

    pub fn is_pending(&self, kind: DocumentKind) -> bool {
        self.pending.values().any(|pending| *pending == kind)
    }

    pub fn failures(&self) -> &BTreeMap<DocumentKind, String> {
        &self.failures
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.failures.clear();
    }
}

/// Raw file handed to the upload service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("file is empty")]
    EmptyFile,
    #[error("upload ticket {0:?} is not pending")]
    UnknownTicket(UploadTicket),
    #[error("upload service rejected the file: {0}")]
    Rejected(String),
    #[error("upload service unavailable: {0}")]
    Transport(String),
}

/// Object storage for uploaded application documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<StoredDocument, UploadError>;
}
