use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::documents::DocumentKind;
use super::input::{
    AvailabilityInput, ContactInput, CurrentEmploymentInput, DateOfBirthInput, DeclarationsInput,
    DisabilityInput, EducationInput, NameInput, NationalInsuranceInput, NhsNumberInput,
    PreviousEmploymentInput, ProfilePictureInput, RefereesInput, ReviewInput, RoleInput,
    StepInput,
};
use super::steps::Section;

/// Lifecycle status stamped on every record; the wizard only ever creates `Applied`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    UnderReview,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub const fn is_yes(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

/// Postal address captured for the current and, optionally, the previous residence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub postcode: Option<String>,
}

/// Fixed-key weekday availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Availability {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl Availability {
    pub const fn days(&self) -> [bool; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    pub fn any(&self) -> bool {
        self.days().iter().any(|day| *day)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub qualification: Option<String>,
    pub award_date: Option<NaiveDate>,
    pub grade: Option<String>,
    pub certificate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentEmployment {
    pub employer: Option<String>,
    pub job_title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub duties: Option<String>,
    pub notice_period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviousEmployment {
    pub employer: Option<String>,
    pub job_title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason_for_leaving: Option<String>,
    pub has_employment_gaps: Option<bool>,
    pub employment_gaps_explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefereeRelationship {
    LineManager,
    Colleague,
    Tutor,
    Client,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Referee {
    pub name: Option<String>,
    pub job_title: Option<String>,
    pub organisation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<RefereeRelationship>,
    pub other_relationship: Option<String>,
    pub would_reemploy: Option<YesNo>,
    pub reemploy_reason: Option<String>,
}

/// Two professional referees and an optional personal one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Referees {
    pub first: Option<Referee>,
    pub second: Option<Referee>,
    pub personal: Option<Referee>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Declarations {
    pub information_accurate: bool,
    pub data_processing_consent: bool,
    pub roa_declaration: bool,
    pub criminal_conviction: Option<bool>,
    pub criminal_conviction_details: Option<String>,
}

/// Stored location(s) of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentSlot {
    Single(String),
    Multiple(Vec<String>),
}

impl DocumentSlot {
    pub fn urls(&self) -> Vec<&str> {
        match self {
            DocumentSlot::Single(url) => vec![url.as_str()],
            DocumentSlot::Multiple(urls) => urls.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DocumentSlot::Single(url) => url.trim().is_empty(),
            DocumentSlot::Multiple(urls) => urls.is_empty(),
        }
    }
}

/// The single aggregate built up by the wizard and handed to the submission gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_insurance_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nhs_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<EducationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_employed: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_employment: Option<CurrentEmployment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_employments: Vec<PreviousEmployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_applied_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_previous_address: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_disability: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_reasonable_adjustment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasonable_adjustment_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referees: Option<Referees>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub documents: BTreeMap<DocumentKind, DocumentSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declarations: Option<Declarations>,
}

impl ApplicationRecord {
    /// A fresh record carrying only the initial status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a normalized step input into the fields that input's section owns.
    ///
    /// Nested groups and lists are replaced wholesale; nothing outside the
    /// section is touched, so merging the same input twice is a no-op.
    pub fn merge(&mut self, input: StepInput) {
        match input {
            StepInput::ProfilePicture(input) => {
                self.profile_picture_url = input.profile_picture_url;
            }
            StepInput::Name(input) => {
                self.title = input.title;
                self.first_name = input.first_name;
                self.middle_name = input.middle_name;
                self.last_name = input.last_name;
            }
            StepInput::DateOfBirth(input) => self.date_of_birth = input.date_of_birth,
            StepInput::NationalInsurance(input) => {
                self.national_insurance_number = input.national_insurance_number;
            }
            StepInput::NhsNumber(input) => self.nhs_number = input.nhs_number,
            StepInput::Education(input) => self.education = input.education,
            StepInput::CurrentEmployment(input) => {
                self.is_employed = input.is_employed;
                self.current_employment = input.current_employment;
            }
            StepInput::PreviousEmployment(input) => {
                self.previous_employments = input.previous_employments;
            }
            StepInput::Role(input) => {
                self.position_applied_for = input.position_applied_for;
                self.preferred_start_date = input.preferred_start_date;
            }
            StepInput::Contact(input) => {
                self.email = input.email;
                self.phone = input.phone;
                self.address = input.address;
                self.has_previous_address = input.has_previous_address;
                self.previous_address = input.previous_address;
            }
            StepInput::Availability(input) => self.availability = Some(input.availability),
            StepInput::Disability(input) => {
                self.has_disability = input.has_disability;
                self.disability_details = input.disability_details;
                self.needs_reasonable_adjustment = input.needs_reasonable_adjustment;
                self.reasonable_adjustment_details = input.reasonable_adjustment_details;
            }
            StepInput::Referees(input) => self.referees = Some(input.referees),
            StepInput::Declarations(input) => self.declarations = Some(input.declarations),
            StepInput::Documents | StepInput::Review(_) => {}
        }
    }

    /// The slice of this record a screen edits, ready to pre-fill its view.
    pub fn slice(&self, section: Section) -> StepInput {
        match section {
            Section::ProfilePicture => StepInput::ProfilePicture(ProfilePictureInput {
                profile_picture_url: self.profile_picture_url.clone(),
            }),
            Section::Name => StepInput::Name(NameInput {
                title: self.title.clone(),
                first_name: self.first_name.clone(),
                middle_name: self.middle_name.clone(),
                last_name: self.last_name.clone(),
            }),
            Section::DateOfBirth => StepInput::DateOfBirth(DateOfBirthInput {
                date_of_birth: self.date_of_birth,
            }),
            Section::NationalInsurance => StepInput::NationalInsurance(NationalInsuranceInput {
                national_insurance_number: self.national_insurance_number.clone(),
            }),
            Section::NhsNumber => StepInput::NhsNumber(NhsNumberInput {
                nhs_number: self.nhs_number.clone(),
            }),
            Section::Education => StepInput::Education(EducationInput {
                education: self.education.clone(),
            }),
            Section::CurrentEmployment => StepInput::CurrentEmployment(CurrentEmploymentInput {
                is_employed: self.is_employed,
                current_employment: self.current_employment.clone(),
            }),
            Section::PreviousEmployment => {
                StepInput::PreviousEmployment(PreviousEmploymentInput {
                    previous_employments: self.previous_employments.clone(),
                })
            }
            Section::Role => StepInput::Role(RoleInput {
                position_applied_for: self.position_applied_for.clone(),
                preferred_start_date: self.preferred_start_date,
            }),
            Section::Contact => StepInput::Contact(ContactInput {
                email: self.email.clone(),
                phone: self.phone.clone(),
                address: self.address.clone(),
                has_previous_address: self.has_previous_address,
                previous_address: self.previous_address.clone(),
            }),
            Section::Availability => StepInput::Availability(AvailabilityInput {
                availability: self.availability.unwrap_or_default(),
            }),
            Section::Disability => StepInput::Disability(DisabilityInput {
                has_disability: self.has_disability,
                disability_details: self.disability_details.clone(),
                needs_reasonable_adjustment: self.needs_reasonable_adjustment,
                reasonable_adjustment_details: self.reasonable_adjustment_details.clone(),
            }),
            Section::Referees => StepInput::Referees(RefereesInput {
                referees: self.referees.clone().unwrap_or_default(),
            }),
            Section::Documents => StepInput::Documents,
            Section::Declarations => StepInput::Declarations(DeclarationsInput {
                declarations: self.declarations.clone().unwrap_or_default(),
            }),
            Section::Review => StepInput::Review(ReviewInput::default()),
        }
    }

    /// Record an uploaded file: multi-file kinds append, single-file kinds replace.
    pub fn attach_document(&mut self, kind: DocumentKind, url: impl Into<String>) {
        let url = url.into();
        if !kind.is_multi_file() {
            self.documents.insert(kind, DocumentSlot::Single(url));
            return;
        }

        let slot = self
            .documents
            .entry(kind)
            .or_insert_with(|| DocumentSlot::Multiple(Vec::new()));
        match slot {
            DocumentSlot::Multiple(urls) => {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            DocumentSlot::Single(existing) => {
                let existing = std::mem::take(existing);
                *slot = if existing == url {
                    DocumentSlot::Multiple(vec![existing])
                } else {
                    DocumentSlot::Multiple(vec![existing, url])
                };
            }
        }
    }

    /// Remove one stored URL; returns whether anything was removed.
    pub fn remove_document(&mut self, kind: DocumentKind, url: &str) -> bool {
        let Some(slot) = self.documents.get_mut(&kind) else {
            return false;
        };

        let removed = match slot {
            DocumentSlot::Single(existing) => existing == url,
            DocumentSlot::Multiple(urls) => {
                let before = urls.len();
                urls.retain(|existing| existing != url);
                urls.len() != before
            }
        };

        if removed && (matches!(slot, DocumentSlot::Single(_)) || slot.is_empty()) {
            self.documents.remove(&kind);
        }
        removed
    }

    pub fn has_document(&self, kind: DocumentKind) -> bool {
        self.documents
            .get(&kind)
            .map(|slot| !slot.is_empty())
            .unwrap_or(false)
    }

    pub fn document_urls(&self, kind: DocumentKind) -> Vec<&str> {
        self.documents
            .get(&kind)
            .map(DocumentSlot::urls)
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        [&self.title, &self.first_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
