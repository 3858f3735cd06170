//! Multi-step career application wizard.
//!
//! A [`StepTable`] orders the screens, a [`StepValidator`] gates every
//! transition, and a [`WizardController`] accumulates one [`ApplicationRecord`]
//! before handing it to a [`SubmissionGateway`]. [`WizardSessions`] and
//! [`intake_router`] host many wizards behind HTTP.

pub mod backend;
pub mod controller;
pub mod documents;
pub mod gateway;
pub mod input;
pub mod record;
pub mod router;
pub mod service;
pub mod steps;
pub mod validation;

#[cfg(test)]
mod tests;

pub use backend::HttpBackend;
pub use controller::{Transition, WizardController, WizardError, WizardPhase, WizardSnapshot};
pub use documents::{
    DocumentKind, DocumentStore, StoredDocument, UploadError, UploadFile, UploadTicket,
};
pub use gateway::{ApplicationId, SubmissionError, SubmissionGateway, SubmissionReceipt};
pub use input::{
    AvailabilityInput, ContactInput, CurrentEmploymentInput, DateOfBirthInput, DeclarationsInput,
    DisabilityInput, EducationInput, NameInput, NationalInsuranceInput, NhsNumberInput,
    PreviousEmploymentInput, ProfilePictureInput, RefereesInput, ReviewInput, RoleInput,
    StepInput,
};
pub use record::{
    Address, ApplicationRecord, ApplicationStatus, Availability, CurrentEmployment,
    Declarations, DocumentSlot, EducationEntry, PreviousEmployment, Referee,
    RefereeRelationship, Referees, YesNo,
};
pub use router::intake_router;
pub use service::{SessionError, SessionId, SessionView, WizardSessions};
pub use steps::{
    Cursor, ScreenDescriptor, Section, Step, StepDescriptor, StepKind, StepTable, StepTableError,
};
pub use validation::{FieldErrors, StepValidator, ValidationContext, ValidationResult};
