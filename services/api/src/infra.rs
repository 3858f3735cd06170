use async_trait::async_trait;
use career_intake::workflows::intake::{
    ApplicationId, ApplicationRecord, DocumentStore, StoredDocument, SubmissionError,
    SubmissionGateway, SubmissionReceipt, UploadError, UploadFile,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keeps submitted records in memory; can refuse the first few submissions.
#[derive(Default)]
pub(crate) struct InMemorySubmissionGateway {
    records: Mutex<Vec<ApplicationRecord>>,
    failures_remaining: AtomicUsize,
}

impl InMemorySubmissionGateway {
    pub(crate) fn failing_first(failures: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(failures),
        }
    }

    pub(crate) fn records(&self) -> Vec<ApplicationRecord> {
        self.records.lock().expect("gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionGateway for InMemorySubmissionGateway {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let refused = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(SubmissionError::Rejected {
                status: 503,
                message: "persistence backend is warming up".to_string(),
            });
        }

        let mut guard = self.records.lock().expect("gateway mutex poisoned");
        guard.push(record.clone());
        Ok(SubmissionReceipt {
            id: ApplicationId(format!("app-{:06}", guard.len())),
        })
    }
}

#[derive(Default)]
pub(crate) struct InMemoryDocumentStore {
    uploads: AtomicUsize,
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upload(&self, file: UploadFile) -> Result<StoredDocument, UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        let sequence = self.uploads.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(StoredDocument {
            file_url: format!("memory://documents/{sequence:04}/{}", file.file_name),
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
