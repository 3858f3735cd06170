mod rules;
mod schema;

pub use schema::{FieldErrors, FieldValue, StepSchema, ValidationContext};

use super::input::{
    AvailabilityInput, ContactInput, CurrentEmploymentInput, DateOfBirthInput, DeclarationsInput,
    DisabilityInput, EducationInput, NameInput, NationalInsuranceInput, NhsNumberInput,
    PreviousEmploymentInput, ProfilePictureInput, RefereesInput, ReviewInput, RoleInput,
    StepInput,
};
use super::steps::Section;

/// Outcome of validating one screen's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The normalized payload, with gated-off fields cleared, ready to merge.
    Valid(StepInput),
    Invalid(FieldErrors),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn into_result(self) -> Result<StepInput, FieldErrors> {
        match self {
            ValidationResult::Valid(input) => Ok(input),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Sections whose accumulated data the review screen re-checks before submission.
const REVIEWED_SECTIONS: [Section; 15] = [
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
    Section::Documents,
    Section::Declarations,
];

/// Per-section schemas evaluated uniformly; a pure function of its inputs.
pub struct StepValidator {
    profile_picture: StepSchema<ProfilePictureInput>,
    name: StepSchema<NameInput>,
    date_of_birth: StepSchema<DateOfBirthInput>,
    national_insurance: StepSchema<NationalInsuranceInput>,
    nhs_number: StepSchema<NhsNumberInput>,
    education: StepSchema<EducationInput>,
    current_employment: StepSchema<CurrentEmploymentInput>,
    previous_employment: StepSchema<PreviousEmploymentInput>,
    role: StepSchema<RoleInput>,
    contact: StepSchema<ContactInput>,
    availability: StepSchema<AvailabilityInput>,
    disability: StepSchema<DisabilityInput>,
    referees: StepSchema<RefereesInput>,
    documents: StepSchema<()>,
    declarations: StepSchema<DeclarationsInput>,
    review: StepSchema<ReviewInput>,
}

impl Default for StepValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for StepValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepValidator").finish_non_exhaustive()
    }
}

impl StepValidator {
    pub fn standard() -> Self {
        Self {
            profile_picture: rules::profile_picture(),
            name: rules::name(),
            date_of_birth: rules::date_of_birth(),
            national_insurance: rules::national_insurance(),
            nhs_number: rules::nhs_number(),
            education: rules::education(),
            current_employment: rules::current_employment(),
            previous_employment: rules::previous_employment(),
            role: rules::role(),
            contact: rules::contact(),
            availability: rules::availability(),
            disability: rules::disability(),
            referees: rules::referees(),
            documents: rules::documents(),
            declarations: rules::declarations(),
            review: rules::review(),
        }
    }

    /// Validate a candidate payload against its section's schema.
    pub fn validate(&self, input: StepInput, context: &ValidationContext<'_>) -> ValidationResult {
        let outcome = match input {
            StepInput::ProfilePicture(input) => self
                .profile_picture
                .apply(input, context)
                .map(StepInput::ProfilePicture),
            StepInput::Name(input) => self.name.apply(input, context).map(StepInput::Name),
            StepInput::DateOfBirth(input) => self
                .date_of_birth
                .apply(input, context)
                .map(StepInput::DateOfBirth),
            StepInput::NationalInsurance(input) => self
                .national_insurance
                .apply(input, context)
                .map(StepInput::NationalInsurance),
            StepInput::NhsNumber(input) => self
                .nhs_number
                .apply(input, context)
                .map(StepInput::NhsNumber),
            StepInput::Education(input) => self
                .education
                .apply(input, context)
                .map(StepInput::Education),
            StepInput::CurrentEmployment(input) => self
                .current_employment
                .apply(input, context)
                .map(StepInput::CurrentEmployment),
            StepInput::PreviousEmployment(input) => self
                .previous_employment
                .apply(input, context)
                .map(StepInput::PreviousEmployment),
            StepInput::Role(input) => self.role.apply(input, context).map(StepInput::Role),
            StepInput::Contact(input) => {
                self.contact.apply(input, context).map(StepInput::Contact)
            }
            StepInput::Availability(input) => self
                .availability
                .apply(input, context)
                .map(StepInput::Availability),
            StepInput::Disability(input) => self
                .disability
                .apply(input, context)
                .map(StepInput::Disability),
            StepInput::Referees(input) => self
                .referees
                .apply(input, context)
                .map(StepInput::Referees),
            StepInput::Documents => self.validate_documents(context).map(|_| StepInput::Documents),
            StepInput::Declarations(input) => self
                .declarations
                .apply(input, context)
                .map(StepInput::Declarations),
            StepInput::Review(input) => self.validate_review(input, context),
        };

        match outcome {
            Ok(normalized) => ValidationResult::Valid(normalized),
            Err(errors) => ValidationResult::Invalid(errors),
        }
    }

    fn validate_documents(&self, context: &ValidationContext<'_>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.documents
            .check_into(&(), context, "documents", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The review screen passes only when the confirmation is given and every
    /// earlier section of the accumulated record still satisfies its schema.
    fn validate_review(
        &self,
        input: ReviewInput,
        context: &ValidationContext<'_>,
    ) -> Result<StepInput, FieldErrors> {
        let mut errors = match self.review.apply(input, context) {
            Ok(_) => FieldErrors::new(),
            Err(errors) => errors,
        };

        for section in REVIEWED_SECTIONS {
            let slice = context.record.slice(section);
            if let ValidationResult::Invalid(section_errors) = self.validate(slice, context) {
                errors.extend(section_errors);
            }
        }

        if errors.is_empty() {
            Ok(StepInput::Review(ReviewInput { confirmed: true }))
        } else {
            Err(errors)
        }
    }
}
