use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::controller::{Transition, WizardController, WizardError, WizardSnapshot};
use super::documents::{DocumentKind, DocumentStore, UploadFile};
use super::gateway::SubmissionGateway;
use super::input::StepInput;
use super::steps::{ScreenDescriptor, StepTable};
use super::validation::{FieldErrors, StepValidator};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

type SharedWizard<G> = Arc<tokio::sync::Mutex<WizardController<G>>>;

/// Everything a remote renderer needs to draw the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub total_steps: usize,
    #[serde(flatten)]
    pub snapshot: WizardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefill: Option<StepInput>,
    pub field_errors: FieldErrors,
    pub pending_uploads: BTreeSet<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_error: Option<String>,
}

impl SessionView {
    fn of<G>(session_id: &SessionId, wizard: &WizardController<G>) -> Self
    where
        G: SubmissionGateway + 'static,
    {
        let step_label = wizard
            .cursor()
            .and_then(|cursor| wizard.table().descriptor_at(cursor.position))
            .map(|step| step.label);

        Self {
            session_id: session_id.clone(),
            total_steps: wizard.table().total_steps(),
            snapshot: wizard.snapshot(),
            step_label,
            screen: wizard.current_screen().cloned(),
            prefill: wizard.current_slice(),
            field_errors: wizard.field_errors().clone(),
            pending_uploads: wizard.pending_uploads(),
            submission_error: wizard.submission_error().map(str::to_string),
        }
    }
}

/// Error raised by the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session {0} is already processing a request")]
    Busy(SessionId),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// Hosts independent wizards, one per applicant session.
///
/// Step transitions lock their wizard with `try_lock`, so a request arriving
/// while a submission is in flight is refused rather than queued. Upload I/O
/// runs outside the lock.
pub struct WizardSessions<G, D> {
    table: Arc<StepTable>,
    validator: Arc<StepValidator>,
    gateway: Arc<G>,
    documents: Arc<D>,
    today: Option<NaiveDate>,
    sessions: Mutex<HashMap<SessionId, SharedWizard<G>>>,
}

impl<G, D> WizardSessions<G, D>
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(gateway: Arc<G>, documents: Arc<D>) -> Self {
        Self {
            table: Arc::new(StepTable::standard()),
            validator: Arc::new(StepValidator::standard()),
            gateway,
            documents,
            today: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate date rules for new sessions against a fixed day.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn steps(&self) -> &StepTable {
        &self.table
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .len()
    }

    pub fn create(&self) -> SessionView {
        let mut wizard = WizardController::with_parts(
            Arc::clone(&self.table),
            Arc::clone(&self.validator),
            Arc::clone(&self.gateway),
        );
        if let Some(today) = self.today {
            wizard = wizard.with_today(today);
        }

        let session_id = next_session_id();
        let view = SessionView::of(&session_id, &wizard);
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .insert(session_id.clone(), Arc::new(tokio::sync::Mutex::new(wizard)));

        info!(%session_id, "intake session opened");
        view
    }

    pub async fn get(&self, session_id: &SessionId) -> Result<SessionView, SessionError> {
        let wizard = self.wizard(session_id)?;
        let guard = wizard.lock().await;
        Ok(SessionView::of(session_id, &guard))
    }

    pub async fn next(
        &self,
        session_id: &SessionId,
        input: StepInput,
    ) -> Result<(Transition, SessionView), SessionError> {
        let wizard = self.wizard(session_id)?;
        let mut guard = self.claim(session_id, &wizard)?;
        let transition = guard.next(input).await?;
        let view = SessionView::of(session_id, &guard);
        drop(guard);
        self.settle(session_id, &transition);
        Ok((transition, view))
    }

    pub async fn back(
        &self,
        session_id: &SessionId,
    ) -> Result<(Transition, SessionView), SessionError> {
        let wizard = self.wizard(session_id)?;
        let mut guard = self.claim(session_id, &wizard)?;
        let transition = guard.back()?;
        Ok((transition, SessionView::of(session_id, &guard)))
    }

    pub async fn skip(
        &self,
        session_id: &SessionId,
    ) -> Result<(Transition, SessionView), SessionError> {
        let wizard = self.wizard(session_id)?;
        let mut guard = self.claim(session_id, &wizard)?;
        let transition = guard.skip().await?;
        let view = SessionView::of(session_id, &guard);
        drop(guard);
        self.settle(session_id, &transition);
        Ok((transition, view))
    }

    /// Abandon the wizard and drop the session.
    pub async fn abandon(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let wizard = self.wizard(session_id)?;
        {
            let mut guard = self.claim(session_id, &wizard)?;
            match guard.abandon() {
                Ok(()) | Err(WizardError::Finished) => {}
                Err(other) => return Err(other.into()),
            }
        }

        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .remove(session_id);
        info!(%session_id, "intake session closed");
        Ok(())
    }

    /// Store a document and attach it to the session's record.
    pub async fn upload(
        &self,
        session_id: &SessionId,
        kind: DocumentKind,
        file: UploadFile,
    ) -> Result<SessionView, SessionError> {
        let wizard = self.wizard(session_id)?;
        let ticket = self.claim(session_id, &wizard)?.begin_upload(kind)?;

        let outcome = self.documents.upload(file).await;

        let mut guard = wizard.lock().await;
        match outcome {
            Ok(document) => {
                guard.complete_upload(ticket, document)?;
            }
            Err(failure) => {
                guard.fail_upload(ticket, failure.clone())?;
                return Err(WizardError::Upload(failure).into());
            }
        }
        Ok(SessionView::of(session_id, &guard))
    }

    pub async fn remove_document(
        &self,
        session_id: &SessionId,
        kind: DocumentKind,
        url: &str,
    ) -> Result<(bool, SessionView), SessionError> {
        let wizard = self.wizard(session_id)?;
        let mut guard = self.claim(session_id, &wizard)?;
        let removed = guard.remove_document(kind, url)?;
        Ok((removed, SessionView::of(session_id, &guard)))
    }

    /// A submitted wizard has discarded its record; its session goes with it.
    fn settle(&self, session_id: &SessionId, transition: &Transition) {
        if let Transition::Submitted { application_id } = transition {
            self.sessions
                .lock()
                .expect("session registry mutex poisoned")
                .remove(session_id);
            info!(%session_id, %application_id, "intake session closed after submission");
        }
    }

    fn wizard(&self, session_id: &SessionId) -> Result<SharedWizard<G>, SessionError> {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    fn claim<'a>(
        &self,
        session_id: &SessionId,
        wizard: &'a SharedWizard<G>,
    ) -> Result<tokio::sync::MutexGuard<'a, WizardController<G>>, SessionError> {
        wizard.try_lock().map_err(|_| {
            debug!(%session_id, "rejecting request while session is locked");
            SessionError::Busy(session_id.clone())
        })
    }
}
