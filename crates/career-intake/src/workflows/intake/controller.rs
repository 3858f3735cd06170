use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::documents::{
    DocumentKind, DocumentStore, StoredDocument, UploadError, UploadFile, UploadTicket,
    UploadTracker,
};
use super::gateway::{ApplicationId, SubmissionError, SubmissionGateway};
use super::input::StepInput;
use super::record::ApplicationRecord;
use super::steps::{Cursor, ScreenDescriptor, Section, StepTable, StepTableError};
use super::validation::{FieldErrors, StepValidator, ValidationContext, ValidationResult};

/// Where a wizard is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WizardPhase {
    AtStep(Cursor),
    Submitted { application_id: ApplicationId },
    Abandoned,
}

impl WizardPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WizardPhase::AtStep(_))
    }
}

/// Result of a step transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Moved { from: Cursor, to: Cursor },
    /// `back` at the very first screen.
    Stayed { at: Cursor },
    Submitted { application_id: ApplicationId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("step input is invalid: {0}")]
    Validation(FieldErrors),
    #[error("expected input for {expected:?} but received {found:?}")]
    UnexpectedSection { expected: Section, found: Section },
    #[error("{0:?} cannot be skipped")]
    NotSkippable(Section),
    #[error("wizard has already been submitted or abandoned")]
    Finished,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    StepTable(#[from] StepTableError),
}

/// Restorable wizard state: phase, accumulated record and per-step resume points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub phase: WizardPhase,
    pub record: ApplicationRecord,
    #[serde(default)]
    pub resume_sub_steps: BTreeMap<usize, usize>,
    #[serde(default)]
    pub upload_errors: BTreeMap<DocumentKind, String>,
}

/// Drives one applicant through the step table, one transition at a time.
pub struct WizardController<G> {
    table: Arc<StepTable>,
    validator: Arc<StepValidator>,
    gateway: Arc<G>,
    phase: WizardPhase,
    record: ApplicationRecord,
    resume_sub_steps: BTreeMap<usize, usize>,
    uploads: UploadTracker,
    field_errors: FieldErrors,
    submission_error: Option<String>,
    today: Option<NaiveDate>,
}

impl<G> WizardController<G>
where
    G: SubmissionGateway + 'static,
{
    /// Standard nine-step wizard backed by `gateway`.
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_parts(
            Arc::new(StepTable::standard()),
            Arc::new(StepValidator::standard()),
            gateway,
        )
    }

    pub fn with_parts(
        table: Arc<StepTable>,
        validator: Arc<StepValidator>,
        gateway: Arc<G>,
    ) -> Self {
        let phase = WizardPhase::AtStep(table.initial_cursor());
        Self {
            table,
            validator,
            gateway,
            phase,
            record: ApplicationRecord::new(),
            resume_sub_steps: BTreeMap::new(),
            uploads: UploadTracker::default(),
            field_errors: FieldErrors::new(),
            submission_error: None,
            today: None,
        }
    }

    /// Resume a wizard from a previously taken snapshot.
    pub fn restore(
        table: Arc<StepTable>,
        validator: Arc<StepValidator>,
        gateway: Arc<G>,
        snapshot: WizardSnapshot,
    ) -> Result<Self, WizardError> {
        if let WizardPhase::AtStep(cursor) = &snapshot.phase {
            table.screen_at(*cursor)?;
        }

        let mut uploads = UploadTracker::default();
        for (kind, message) in snapshot.upload_errors {
            uploads.record_failure(kind, message);
        }

        let mut controller = Self::with_parts(table, validator, gateway);
        controller.phase = snapshot.phase;
        controller.record = snapshot.record;
        controller.resume_sub_steps = snapshot.resume_sub_steps;
        controller.uploads = uploads;
        Ok(controller)
    }

    /// Pin the date age and date-order rules are evaluated against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    pub fn phase(&self) -> &WizardPhase {
        &self.phase
    }

    pub fn record(&self) -> &ApplicationRecord {
        &self.record
    }

    pub fn cursor(&self) -> Option<Cursor> {
        match self.phase {
            WizardPhase::AtStep(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn current_screen(&self) -> Option<&ScreenDescriptor> {
        self.cursor()
            .and_then(|cursor| self.table.screen_at(cursor).ok())
    }

    /// The current screen's slice of the record, for pre-filling its form.
    pub fn current_slice(&self) -> Option<StepInput> {
        self.current_screen()
            .map(|screen| self.record.slice(screen.section))
    }

    /// Errors from the most recent rejected `next`; cleared by any accepted transition.
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.submission_error.as_deref()
    }

    pub fn upload_errors(&self) -> &BTreeMap<DocumentKind, String> {
        self.uploads.failures()
    }

    pub fn pending_uploads(&self) -> BTreeSet<DocumentKind> {
        self.uploads.pending_kinds()
    }

    pub fn resume_sub_step(&self, position: usize) -> Option<usize> {
        self.resume_sub_steps.get(&position).copied()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            phase: self.phase.clone(),
            record: self.record.clone(),
            resume_sub_steps: self.resume_sub_steps.clone(),
            upload_errors: self.uploads.failures().clone(),
        }
    }

    /// Validate the current screen's input, merge it, and move forward.
    ///
    /// Leaving the last step submits the record. A failed submission keeps
    /// the wizard on the last step with its record intact, so calling `next`
    /// again retries.
    pub async fn next(&mut self, input: StepInput) -> Result<Transition, WizardError> {
        let from = self.active_cursor()?;
        let screen = self.screen(from)?;
        if input.section() != screen.section {
            return Err(WizardError::UnexpectedSection {
                expected: screen.section,
                found: input.section(),
            });
        }

        let pending = self.uploads.pending_kinds();
        let context = ValidationContext {
            record: &self.record,
            today: self.today(),
            pending_uploads: &pending,
        };

        match self.validator.validate(input, &context) {
            ValidationResult::Invalid(errors) => {
                debug!(
                    section = ?screen.section,
                    fields = errors.len(),
                    "step input rejected"
                );
                self.field_errors = errors.clone();
                Err(WizardError::Validation(errors))
            }
            ValidationResult::Valid(normalized) => {
                self.field_errors = FieldErrors::new();
                self.record.merge(normalized);
                self.advance(from).await
            }
        }
    }

    /// Move to the previous screen; a no-op on the first screen.
    pub fn back(&mut self) -> Result<Transition, WizardError> {
        let from = self.active_cursor()?;

        let to = match from.sub_position {
            Some(sub) if sub > 1 => Cursor::at_sub(from.position, sub - 1),
            _ if from.position <= 1 => return Ok(Transition::Stayed { at: from }),
            _ => {
                if let Some(sub) = from.sub_position {
                    self.resume_sub_steps.insert(from.position, sub);
                }
                let previous = self
                    .table
                    .descriptor_at(from.position - 1)
                    .ok_or(StepTableError::OutOfRange(from))?;
                match previous.sub_step_count() {
                    Some(count) => {
                        let resume = self
                            .resume_sub_steps
                            .get(&previous.position)
                            .copied()
                            .unwrap_or(count)
                            .clamp(1, count);
                        Cursor::at_sub(previous.position, resume)
                    }
                    None => Cursor::at(previous.position),
                }
            }
        };

        self.field_errors = FieldErrors::new();
        self.submission_error = None;
        self.phase = WizardPhase::AtStep(to);
        debug!(?from, ?to, "moved back");
        Ok(Transition::Moved { from, to })
    }

    /// Leave a skippable screen without answering it.
    pub async fn skip(&mut self) -> Result<Transition, WizardError> {
        let from = self.active_cursor()?;
        let screen = self.screen(from)?;
        if !screen.skippable {
            return Err(WizardError::NotSkippable(screen.section));
        }

        self.record.merge(StepInput::empty(screen.section));
        self.field_errors = FieldErrors::new();
        info!(section = ?screen.section, "step skipped");
        self.advance(from).await
    }

    /// Give up on the application and discard everything entered so far.
    pub fn abandon(&mut self) -> Result<(), WizardError> {
        if self.phase.is_terminal() {
            return Err(WizardError::Finished);
        }

        self.reset();
        self.phase = WizardPhase::Abandoned;
        info!("application abandoned");
        Ok(())
    }

    /// Register an upload that is about to start for `kind`.
    pub fn begin_upload(&mut self, kind: DocumentKind) -> Result<UploadTicket, WizardError> {
        self.active_cursor()?;
        let ticket = self.uploads.begin(kind);
        debug!(?kind, ?ticket, "document upload started");
        Ok(ticket)
    }

    /// Attach a stored document to the record and clear any earlier failure for its kind.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        document: StoredDocument,
    ) -> Result<DocumentKind, WizardError> {
        let kind = self
            .uploads
            .settle(ticket)
            .ok_or(UploadError::UnknownTicket(ticket))?;
        self.uploads.clear_failure(kind);
        self.record.attach_document(kind, document.file_url);
        info!(?kind, "document attached");
        Ok(kind)
    }

    /// Settle a ticket whose upload failed; the error is kept against its kind.
    pub fn fail_upload(
        &mut self,
        ticket: UploadTicket,
        failure: UploadError,
    ) -> Result<DocumentKind, WizardError> {
        let kind = self
            .uploads
            .settle(ticket)
            .ok_or(UploadError::UnknownTicket(ticket))?;
        warn!(?kind, error = %failure, "document upload failed");
        self.uploads.record_failure(kind, failure.to_string());
        Ok(kind)
    }

    /// Upload and attach in one call, for callers that own the controller exclusively.
    pub async fn upload<D>(
        &mut self,
        store: &D,
        kind: DocumentKind,
        file: UploadFile,
    ) -> Result<DocumentKind, WizardError>
    where
        D: DocumentStore + ?Sized,
    {
        let ticket = self.begin_upload(kind)?;
        match store.upload(file).await {
            Ok(document) => self.complete_upload(ticket, document),
            Err(failure) => {
                self.fail_upload(ticket, failure.clone())?;
                Err(WizardError::Upload(failure))
            }
        }
    }

    pub fn remove_document(&mut self, kind: DocumentKind, url: &str) -> Result<bool, WizardError> {
        self.active_cursor()?;
        let removed = self.record.remove_document(kind, url);
        if removed {
            debug!(?kind, "document removed");
        }
        Ok(removed)
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn active_cursor(&self) -> Result<Cursor, WizardError> {
        self.cursor().ok_or(WizardError::Finished)
    }

    fn screen(&self, cursor: Cursor) -> Result<ScreenDescriptor, WizardError> {
        self.table.screen_at(cursor).cloned().map_err(|err| {
            error!(error = %err, "wizard cursor left the step table");
            WizardError::StepTable(err)
        })
    }

    async fn advance(&mut self, from: Cursor) -> Result<Transition, WizardError> {
        self.submission_error = None;
        let table = Arc::clone(&self.table);
        let step = table
            .descriptor_at(from.position)
            .ok_or(StepTableError::OutOfRange(from))?;

        if let (Some(sub), Some(count)) = (from.sub_position, step.sub_step_count()) {
            if sub < count {
                let to = Cursor::at_sub(from.position, sub + 1);
                self.phase = WizardPhase::AtStep(to);
                debug!(?from, ?to, "advanced to next sub-step");
                return Ok(Transition::Moved { from, to });
            }
        }

        if let Some(sub) = from.sub_position {
            self.resume_sub_steps.insert(from.position, sub);
        }

        match table.descriptor_at(from.position + 1) {
            Some(next) => {
                let to = next.entry_cursor();
                self.phase = WizardPhase::AtStep(to);
                info!(step = step.label, position = from.position, "step completed");
                Ok(Transition::Moved { from, to })
            }
            None => self.submit().await,
        }
    }

    async fn submit(&mut self) -> Result<Transition, WizardError> {
        let gateway = Arc::clone(&self.gateway);
        match gateway.submit(&self.record).await {
            Ok(receipt) => {
                info!(application_id = %receipt.id, "application submitted");
                self.reset();
                self.phase = WizardPhase::Submitted {
                    application_id: receipt.id.clone(),
                };
                Ok(Transition::Submitted {
                    application_id: receipt.id,
                })
            }
            Err(failure) => {
                warn!(error = %failure, "application submission failed");
                self.submission_error = Some(failure.to_string());
                Err(WizardError::Submission(failure))
            }
        }
    }

    fn reset(&mut self) {
        self.record = ApplicationRecord::new();
        self.resume_sub_steps.clear();
        self.uploads.clear();
        self.field_errors = FieldErrors::new();
        self.submission_error = None;
    }
}
