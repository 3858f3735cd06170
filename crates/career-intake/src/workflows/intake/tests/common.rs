use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::intake::documents::{
    DocumentKind, DocumentStore, StoredDocument, UploadError, UploadFile,
};
use crate::workflows::intake::gateway::{
    ApplicationId, SubmissionError, SubmissionGateway, SubmissionReceipt,
};
use crate::workflows::intake::input::{
    AvailabilityInput, ContactInput, CurrentEmploymentInput, DateOfBirthInput, DeclarationsInput,
    DisabilityInput, EducationInput, NameInput, NationalInsuranceInput, NhsNumberInput,
    PreviousEmploymentInput, ProfilePictureInput, RefereesInput, ReviewInput, RoleInput,
    StepInput,
};
use crate::workflows::intake::record::{
    Address, ApplicationRecord, Availability, CurrentEmployment, Declarations, EducationEntry,
    PreviousEmployment, Referee, RefereeRelationship, Referees, YesNo,
};
use crate::workflows::intake::service::{SessionId, WizardSessions};
use crate::workflows::intake::steps::Section;
use crate::workflows::intake::validation::{StepValidator, ValidationContext, ValidationResult};
use crate::workflows::intake::WizardController;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 6, 1)
}

pub(super) fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

pub(super) fn profile_picture_input() -> ProfilePictureInput {
    ProfilePictureInput {
        profile_picture_url: some("https://cdn.example.test/avatars/ada.png"),
    }
}

pub(super) fn name_input() -> NameInput {
    NameInput {
        title: some("Ms"),
        first_name: some("Ada"),
        middle_name: None,
        last_name: some("Lovelace"),
    }
}

pub(super) fn date_of_birth_input() -> DateOfBirthInput {
    DateOfBirthInput {
        date_of_birth: Some(date(1990, 4, 12)),
    }
}

pub(super) fn national_insurance_input() -> NationalInsuranceInput {
    NationalInsuranceInput {
        national_insurance_number: some("AB123456C"),
    }
}

pub(super) fn nhs_number_input() -> NhsNumberInput {
    NhsNumberInput {
        nhs_number: some("943 476 5919"),
    }
}

pub(super) fn education_entry() -> EducationEntry {
    EducationEntry {
        institution: some("Leeds City College"),
        qualification: some("NVQ Level 3 Health and Social Care"),
        award_date: Some(date(2012, 7, 1)),
        grade: some("Distinction"),
        certificate: None,
    }
}

pub(super) fn education_input() -> EducationInput {
    EducationInput {
        education: vec![education_entry()],
    }
}

pub(super) fn current_job() -> CurrentEmployment {
    CurrentEmployment {
        employer: some("Northern Care Ltd"),
        job_title: some("Care Assistant"),
        start_date: Some(date(2019, 3, 1)),
        duties: some("Personal care and medication rounds"),
        notice_period: some("4 weeks"),
    }
}

pub(super) fn current_employment_input() -> CurrentEmploymentInput {
    CurrentEmploymentInput {
        is_employed: Some(YesNo::Yes),
        current_employment: Some(current_job()),
    }
}

pub(super) fn previous_job() -> PreviousEmployment {
    PreviousEmployment {
        employer: some("St Mary's Hospice"),
        job_title: some("Support Worker"),
        start_date: Some(date(2014, 1, 6)),
        end_date: Some(date(2019, 2, 15)),
        reason_for_leaving: some("Career progression"),
        has_employment_gaps: Some(false),
        employment_gaps_explanation: None,
    }
}

pub(super) fn previous_employment_input() -> PreviousEmploymentInput {
    PreviousEmploymentInput {
        previous_employments: vec![previous_job()],
    }
}

pub(super) fn role_input() -> RoleInput {
    RoleInput {
        position_applied_for: some("Senior Care Assistant"),
        preferred_start_date: Some(date(2025, 7, 1)),
    }
}

pub(super) fn address() -> Address {
    Address {
        line1: some("1 High Street"),
        line2: None,
        town: some("Leeds"),
        county: some("West Yorkshire"),
        postcode: some("LS1 4AP"),
    }
}

pub(super) fn contact_input() -> ContactInput {
    ContactInput {
        email: some("ada@example.test"),
        phone: some("07700 900123"),
        address: Some(address()),
        has_previous_address: Some(false),
        previous_address: None,
    }
}

pub(super) fn availability_input() -> AvailabilityInput {
    AvailabilityInput {
        availability: Availability {
            monday: true,
            wednesday: true,
            ..Availability::default()
        },
    }
}

pub(super) fn disability_input() -> DisabilityInput {
    DisabilityInput {
        has_disability: Some(false),
        disability_details: None,
        needs_reasonable_adjustment: Some(false),
        reasonable_adjustment_details: None,
    }
}

pub(super) fn referee(name: &str, email: &str, relationship: RefereeRelationship) -> Referee {
    Referee {
        name: some(name),
        job_title: some("Registered Manager"),
        organisation: some("Northern Care Ltd"),
        email: some(email),
        phone: some("0113 496 0000"),
        relationship: Some(relationship),
        other_relationship: None,
        would_reemploy: Some(YesNo::Yes),
        reemploy_reason: None,
    }
}

pub(super) fn referees_input() -> RefereesInput {
    RefereesInput {
        referees: Referees {
            first: Some(referee(
                "Grace Hopper",
                "grace@example.test",
                RefereeRelationship::LineManager,
            )),
            second: Some(referee(
                "Alan Turing",
                "alan@example.test",
                RefereeRelationship::Colleague,
            )),
            personal: None,
        },
    }
}

pub(super) fn declarations_input() -> DeclarationsInput {
    DeclarationsInput {
        declarations: Declarations {
            information_accurate: true,
            data_processing_consent: true,
            roa_declaration: true,
            criminal_conviction: Some(false),
            criminal_conviction_details: None,
        },
    }
}

/// A payload that passes the given screen's rules.
pub(super) fn valid_input(section: Section) -> StepInput {
    match section {
        Section::ProfilePicture => StepInput::ProfilePicture(profile_picture_input()),
        Section::Name => StepInput::Name(name_input()),
        Section::DateOfBirth => StepInput::DateOfBirth(date_of_birth_input()),
        Section::NationalInsurance => StepInput::NationalInsurance(national_insurance_input()),
        Section::NhsNumber => StepInput::NhsNumber(nhs_number_input()),
        Section::Education => StepInput::Education(education_input()),
        Section::CurrentEmployment => StepInput::CurrentEmployment(current_employment_input()),
        Section::PreviousEmployment => StepInput::PreviousEmployment(previous_employment_input()),
        Section::Role => StepInput::Role(role_input()),
        Section::Contact => StepInput::Contact(contact_input()),
        Section::Availability => StepInput::Availability(availability_input()),
        Section::Disability => StepInput::Disability(disability_input()),
        Section::Referees => StepInput::Referees(referees_input()),
        Section::Documents => StepInput::Documents,
        Section::Declarations => StepInput::Declarations(declarations_input()),
        Section::Review => StepInput::Review(ReviewInput { confirmed: true }),
    }
}

pub(super) fn document_file(kind: DocumentKind) -> UploadFile {
    UploadFile {
        file_name: format!("{}.pdf", kind.key()),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 test".to_vec(),
    }
}

pub(super) fn document_url(file_name: &str) -> String {
    format!("https://files.example.test/{file_name}")
}

/// Validate against an empty record with nothing uploading.
pub(super) fn validate(input: StepInput) -> ValidationResult {
    validate_against(&ApplicationRecord::new(), &BTreeSet::new(), input)
}

pub(super) fn validate_against(
    record: &ApplicationRecord,
    pending: &BTreeSet<DocumentKind>,
    input: StepInput,
) -> ValidationResult {
    let context = ValidationContext {
        record,
        today: today(),
        pending_uploads: pending,
    };
    StepValidator::standard().validate(input, &context)
}

/// A record holding every section's valid answers and the required documents.
pub(super) fn complete_record() -> ApplicationRecord {
    let mut record = ApplicationRecord::new();
    for section in [
        Section::ProfilePicture,
        Section::Name,
        Section::DateOfBirth,
        Section::NationalInsurance,
        Section::NhsNumber,
        Section::Education,
        Section::CurrentEmployment,
        Section::PreviousEmployment,
        Section::Role,
        Section::Contact,
        Section::Availability,
        Section::Disability,
        Section::Referees,
        Section::Declarations,
    ] {
        record.merge(valid_input(section));
    }
    for kind in DocumentKind::required() {
        record.attach_document(kind, document_url(&format!("{}.pdf", kind.key())));
    }
    record
}

pub(super) fn wizard() -> WizardController<MemoryGateway> {
    WizardController::new(Arc::new(MemoryGateway::default())).with_today(today())
}

pub(super) fn wizard_with<G>(gateway: Arc<G>) -> WizardController<G>
where
    G: SubmissionGateway + 'static,
{
    WizardController::new(gateway).with_today(today())
}

/// Feed valid answers (and required uploads) until `target` is the current screen.
pub(super) async fn drive_to<G>(wizard: &mut WizardController<G>, target: Section)
where
    G: SubmissionGateway + 'static,
{
    loop {
        let section = wizard
            .current_screen()
            .map(|screen| screen.section)
            .expect("wizard is still collecting input");
        if section == target {
            return;
        }
        if section == Section::Documents {
            attach_required_documents(wizard).await;
        }
        wizard
            .next(valid_input(section))
            .await
            .unwrap_or_else(|err| panic!("valid {section:?} input should advance: {err}"));
    }
}

pub(super) async fn attach_required_documents<G>(wizard: &mut WizardController<G>)
where
    G: SubmissionGateway + 'static,
{
    let store = MemoryDocuments::default();
    for kind in DocumentKind::required() {
        wizard
            .upload(&store, kind, document_file(kind))
            .await
            .expect("memory upload succeeds");
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryGateway {
    pub(super) submissions: Arc<Mutex<Vec<ApplicationRecord>>>,
}

impl MemoryGateway {
    pub(super) fn submissions(&self) -> Vec<ApplicationRecord> {
        self.submissions
            .lock()
            .expect("gateway mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl SubmissionGateway for MemoryGateway {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let mut guard = self.submissions.lock().expect("gateway mutex poisoned");
        guard.push(record.clone());
        Ok(SubmissionReceipt {
            id: ApplicationId(format!("app-{:06}", guard.len())),
        })
    }
}

/// Fails the first `failures` submissions, then accepts.
pub(super) struct FlakyGateway {
    failures: usize,
    attempts: AtomicUsize,
    inner: MemoryGateway,
}

impl FlakyGateway {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
            inner: MemoryGateway::default(),
        }
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(super) fn submissions(&self) -> Vec<ApplicationRecord> {
        self.inner.submissions()
    }
}

#[async_trait]
impl SubmissionGateway for FlakyGateway {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(SubmissionError::Transport("connection refused".to_string()));
        }
        self.inner.submit(record).await
    }
}

/// Holds each submission open until released, to observe the in-flight window.
#[derive(Default)]
pub(super) struct BlockingGateway {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    inner: MemoryGateway,
}

#[async_trait]
impl SubmissionGateway for BlockingGateway {
    async fn submit(&self, record: &ApplicationRecord) -> Result<SubmissionReceipt, SubmissionError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.submit(record).await
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDocuments {
    stored: Arc<Mutex<Vec<String>>>,
}

impl MemoryDocuments {
    pub(super) fn stored(&self) -> Vec<String> {
        self.stored.lock().expect("document mutex poisoned").clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn upload(&self, file: UploadFile) -> Result<StoredDocument, UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        let file_url = document_url(&file.file_name);
        self.stored
            .lock()
            .expect("document mutex poisoned")
            .push(file_url.clone());
        Ok(StoredDocument { file_url })
    }
}

pub(super) struct RejectingDocuments;

#[async_trait]
impl DocumentStore for RejectingDocuments {
    async fn upload(&self, _file: UploadFile) -> Result<StoredDocument, UploadError> {
        Err(UploadError::Rejected("file type not allowed".to_string()))
    }
}

pub(super) fn sessions() -> Arc<WizardSessions<MemoryGateway, MemoryDocuments>> {
    Arc::new(
        WizardSessions::new(
            Arc::new(MemoryGateway::default()),
            Arc::new(MemoryDocuments::default()),
        )
        .with_today(today()),
    )
}

/// Session-level counterpart of [`drive_to`].
pub(super) async fn drive_session_to<G, D>(
    sessions: &WizardSessions<G, D>,
    session_id: &SessionId,
    target: Section,
) where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    loop {
        let view = sessions.get(session_id).await.expect("session exists");
        let section = view
            .screen
            .map(|screen| screen.section)
            .expect("session is still collecting input");
        if section == target {
            return;
        }
        if section == Section::Documents {
            for kind in DocumentKind::required() {
                sessions
                    .upload(session_id, kind, document_file(kind))
                    .await
                    .expect("upload succeeds");
            }
        }
        sessions
            .next(session_id, valid_input(section))
            .await
            .unwrap_or_else(|err| panic!("valid {section:?} input should advance: {err}"));
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn object_keys(value: &Value) -> BTreeSet<String> {
    value
        .as_object()
        .expect("json object")
        .keys()
        .cloned()
        .collect()
}
