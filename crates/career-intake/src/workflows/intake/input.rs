//! Typed payloads a renderer hands back for each screen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{
    Address, Availability, CurrentEmployment, Declarations, EducationEntry, PreviousEmployment,
    Referees, YesNo,
};
use super::steps::Section;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilePictureInput {
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NameInput {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateOfBirthInput {
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NationalInsuranceInput {
    pub national_insurance_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NhsNumberInput {
    pub nhs_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationInput {
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentEmploymentInput {
    pub is_employed: Option<YesNo>,
    pub current_employment: Option<CurrentEmployment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviousEmploymentInput {
    pub previous_employments: Vec<PreviousEmployment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoleInput {
    pub position_applied_for: Option<String>,
    pub preferred_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInput {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub has_previous_address: Option<bool>,
    pub previous_address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvailabilityInput {
    pub availability: Availability,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisabilityInput {
    pub has_disability: Option<bool>,
    pub disability_details: Option<String>,
    pub needs_reasonable_adjustment: Option<bool>,
    pub reasonable_adjustment_details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefereesInput {
    pub referees: Referees,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeclarationsInput {
    pub declarations: Declarations,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewInput {
    pub confirmed: bool,
}

/// One screen's worth of data, tagged with the section it belongs to.
///
/// Serialized as `{"section": "name", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "snake_case")]
pub enum StepInput {
    ProfilePicture(ProfilePictureInput),
    Name(NameInput),
    DateOfBirth(DateOfBirthInput),
    NationalInsurance(NationalInsuranceInput),
    NhsNumber(NhsNumberInput),
    Education(EducationInput),
    CurrentEmployment(CurrentEmploymentInput),
    PreviousEmployment(PreviousEmploymentInput),
    Role(RoleInput),
    Contact(ContactInput),
    Availability(AvailabilityInput),
    Disability(DisabilityInput),
    Referees(RefereesInput),
    Documents,
    Declarations(DeclarationsInput),
    Review(ReviewInput),
}

impl StepInput {
    pub const fn section(&self) -> Section {
        match self {
            StepInput::ProfilePicture(_) => Section::ProfilePicture,
            StepInput::Name(_) => Section::Name,
            StepInput::DateOfBirth(_) => Section::DateOfBirth,
            StepInput::NationalInsurance(_) => Section::NationalInsurance,
            StepInput::NhsNumber(_) => Section::NhsNumber,
            StepInput::Education(_) => Section::Education,
            StepInput::CurrentEmployment(_) => Section::CurrentEmployment,
            StepInput::PreviousEmployment(_) => Section::PreviousEmployment,
            StepInput::Role(_) => Section::Role,
            StepInput::Contact(_) => Section::Contact,
            StepInput::Availability(_) => Section::Availability,
            StepInput::Disability(_) => Section::Disability,
            StepInput::Referees(_) => Section::Referees,
            StepInput::Documents => Section::Documents,
            StepInput::Declarations(_) => Section::Declarations,
            StepInput::Review(_) => Section::Review,
        }
    }

    /// The blank payload merged when a screen is skipped.
    pub fn empty(section: Section) -> Self {
        match section {
            Section::ProfilePicture => StepInput::ProfilePicture(Default::default()),
            Section::Name => StepInput::Name(Default::default()),
            Section::DateOfBirth => StepInput::DateOfBirth(Default::default()),
            Section::NationalInsurance => StepInput::NationalInsurance(Default::default()),
            Section::NhsNumber => StepInput::NhsNumber(Default::default()),
            Section::Education => StepInput::Education(Default::default()),
            Section::CurrentEmployment => StepInput::CurrentEmployment(Default::default()),
            Section::PreviousEmployment => StepInput::PreviousEmployment(Default::default()),
            Section::Role => StepInput::Role(Default::default()),
            Section::Contact => StepInput::Contact(Default::default()),
            Section::Availability => StepInput::Availability(Default::default()),
            Section::Disability => StepInput::Disability(Default::default()),
            Section::Referees => StepInput::Referees(Default::default()),
            Section::Documents => StepInput::Documents,
            Section::Declarations => StepInput::Declarations(Default::default()),
            Section::Review => StepInput::Review(Default::default()),
        }
    }
}
