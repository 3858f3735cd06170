use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::super::documents::DocumentKind;
use super::super::input::{
    AvailabilityInput, ContactInput, CurrentEmploymentInput, DateOfBirthInput, DeclarationsInput,
    DisabilityInput, EducationInput, NameInput, NationalInsuranceInput, NhsNumberInput,
    PreviousEmploymentInput, ProfilePictureInput, RefereesInput, ReviewInput, RoleInput,
};
use super::super::record::{
    Address, CurrentEmployment, Declarations, EducationEntry, PreviousEmployment, Referee,
    RefereeRelationship, YesNo,
};
use super::schema::StepSchema;

pub(crate) const MINIMUM_APPLICANT_AGE: u32 = 16;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]?\s*[0-9][A-Z]{2}$").expect("postcode pattern compiles")
});

static NATIONAL_INSURANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-CEGHJ-PR-TW-Z][A-CEGHJ-NPR-TW-Z][0-9]{6}[A-D]$")
        .expect("national insurance pattern compiles")
});

const DISALLOWED_NI_PREFIXES: [&str; 7] = ["BG", "GB", "NK", "KN", "TN", "NT", "ZZ"];

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub(crate) fn is_valid_phone(value: &str) -> bool {
    let trimmed = value.trim();
    let allowed = trimmed
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, ' ' | '+' | '-' | '(' | ')'));
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    allowed && (10..=15).contains(&digits)
}

pub(crate) fn is_valid_postcode(value: &str) -> bool {
    POSTCODE.is_match(value.trim())
}

pub(crate) fn is_valid_url(value: &str) -> bool {
    let trimmed = value.trim();
    (trimmed.starts_with("https://") || trimmed.starts_with("http://"))
        && !trimmed.contains(char::is_whitespace)
}

/// `ab 12 34 56 c` becomes `AB123456C`.
pub(crate) fn compact_national_insurance(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

pub(crate) fn is_valid_national_insurance(value: &str) -> bool {
    let compact = compact_national_insurance(value);

    NATIONAL_INSURANCE.is_match(&compact)
        && !DISALLOWED_NI_PREFIXES
            .iter()
            .any(|prefix| compact.starts_with(prefix))
}

/// Ten digits whose last digit is the modulus 11 check digit of the first nine.
pub(crate) fn is_valid_nhs_number(value: &str) -> bool {
    let compact: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.len() != 10 || !compact.chars().all(|ch| ch.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = compact.chars().filter_map(|ch| ch.to_digit(10)).collect();
    let weighted: u32 = digits[..9]
        .iter()
        .zip((2..=10).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();

    match 11 - (weighted % 11) {
        11 => digits[9] == 0,
        10 => false,
        check => digits[9] == check,
    }
}

fn optional_matches(value: &Option<String>, predicate: fn(&str) -> bool) -> bool {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or(true, predicate)
}

fn not_after(date: Option<NaiveDate>, limit: NaiveDate) -> bool {
    date.map_or(true, |date| date <= limit)
}

pub(crate) fn profile_picture() -> StepSchema<ProfilePictureInput> {
    StepSchema::<ProfilePictureInput>::new().refine("profilePictureUrl", "must be an http(s) URL", |input, _| {
        optional_matches(&input.profile_picture_url, is_valid_url)
    })
}

pub(crate) fn name() -> StepSchema<NameInput> {
    StepSchema::<NameInput>::new()
        .required("title", |input| &input.title)
        .required("firstName", |input| &input.first_name)
        .required("lastName", |input| &input.last_name)
}

pub(crate) fn date_of_birth() -> StepSchema<DateOfBirthInput> {
    StepSchema::<DateOfBirthInput>::new()
        .required("dateOfBirth", |input| &input.date_of_birth)
        .refine("dateOfBirth", "must be in the past", |input, context| {
            input.date_of_birth.map_or(true, |dob| dob < context.today)
        })
        .refine(
            "dateOfBirth",
            "applicant must be at least 16 years old",
            |input, context| {
                input.date_of_birth.map_or(true, |dob| {
                    context
                        .today
                        .years_since(dob)
                        .map_or(false, |age| age >= MINIMUM_APPLICANT_AGE)
                })
            },
        )
}

pub(crate) fn national_insurance() -> StepSchema<NationalInsuranceInput> {
    StepSchema::<NationalInsuranceInput>::new()
        .normalize_with(|input| {
            if let Some(number) = input.national_insurance_number.as_mut() {
                *number = compact_national_insurance(number);
            }
        })
        .required("nationalInsuranceNumber", |input| {
            &input.national_insurance_number
        })
        .refine(
            "nationalInsuranceNumber",
            "must look like AB123456C",
            |input, _| optional_matches(&input.national_insurance_number, is_valid_national_insurance),
        )
}

pub(crate) fn nhs_number() -> StepSchema<NhsNumberInput> {
    StepSchema::<NhsNumberInput>::new().refine(
        "nhsNumber",
        "must be a valid 10 digit NHS number",
        |input, _| optional_matches(&input.nhs_number, is_valid_nhs_number),
    )
}

fn education_entry() -> StepSchema<EducationEntry> {
    StepSchema::<EducationEntry>::new()
        .required("institution", |entry| &entry.institution)
        .required("qualification", |entry| &entry.qualification)
        .required("awardDate", |entry| &entry.award_date)
        .required("grade", |entry| &entry.grade)
        .refine("awardDate", "cannot be in the future", |entry, context| {
            not_after(entry.award_date, context.today)
        })
        .refine("certificate", "must be an http(s) URL", |entry, _| {
            optional_matches(&entry.certificate, is_valid_url)
        })
}

pub(crate) fn education() -> StepSchema<EducationInput> {
    StepSchema::<EducationInput>::new()
        .min_count("education", 1, |input| input.education.len())
        .each(
            "education",
            |input| input.education.as_slice(),
            |input| input.education.as_mut_slice(),
            education_entry(),
        )
}

fn current_employment_details() -> StepSchema<CurrentEmployment> {
    StepSchema::<CurrentEmployment>::new()
        .required("employer", |job| &job.employer)
        .required("jobTitle", |job| &job.job_title)
        .required("startDate", |job| &job.start_date)
        .refine("startDate", "cannot be in the future", |job, context| {
            not_after(job.start_date, context.today)
        })
}

pub(crate) fn current_employment() -> StepSchema<CurrentEmploymentInput> {
    StepSchema::<CurrentEmploymentInput>::new()
        .required("isEmployed", |input| &input.is_employed)
        .gated(
            "currentEmployment",
            |input| input.is_employed == Some(YesNo::Yes),
            |input| &input.current_employment,
            |input| &mut input.current_employment,
        )
        .nested(
            "currentEmployment",
            |input| input.current_employment.as_ref(),
            |input| input.current_employment.as_mut(),
            current_employment_details(),
        )
}

fn previous_employment_entry() -> StepSchema<PreviousEmployment> {
    StepSchema::<PreviousEmployment>::new()
        .required("employer", |job| &job.employer)
        .required("jobTitle", |job| &job.job_title)
        .required("startDate", |job| &job.start_date)
        .required("endDate", |job| &job.end_date)
        .required("reasonForLeaving", |job| &job.reason_for_leaving)
        .required("hasEmploymentGaps", |job| &job.has_employment_gaps)
        .gated(
            "employmentGapsExplanation",
            |job| job.has_employment_gaps == Some(true),
            |job| &job.employment_gaps_explanation,
            |job| &mut job.employment_gaps_explanation,
        )
        .refine("endDate", "must not be before the start date", |job, _| {
            match (job.start_date, job.end_date) {
                (Some(start), Some(end)) => end >= start,
                _ => true,
            }
        })
        .refine("endDate", "cannot be in the future", |job, context| {
            not_after(job.end_date, context.today)
        })
}

pub(crate) fn previous_employment() -> StepSchema<PreviousEmploymentInput> {
    StepSchema::<PreviousEmploymentInput>::new().each(
        "previousEmployments",
        |input| input.previous_employments.as_slice(),
        |input| input.previous_employments.as_mut_slice(),
        previous_employment_entry(),
    )
}

pub(crate) fn role() -> StepSchema<RoleInput> {
    StepSchema::<RoleInput>::new()
        .required("positionAppliedFor", |input| &input.position_applied_for)
        .refine(
            "preferredStartDate",
            "cannot be in the past",
            |input, context| {
                input
                    .preferred_start_date
                    .map_or(true, |date| date >= context.today)
            },
        )
}

fn address() -> StepSchema<Address> {
    StepSchema::<Address>::new()
        .required("line1", |address| &address.line1)
        .required("town", |address| &address.town)
        .required("postcode", |address| &address.postcode)
        .refine("postcode", "must be a valid UK postcode", |address, _| {
            optional_matches(&address.postcode, is_valid_postcode)
        })
}

pub(crate) fn contact() -> StepSchema<ContactInput> {
    StepSchema::<ContactInput>::new()
        .required("email", |input| &input.email)
        .refine("email", "must be a valid email address", |input, _| {
            optional_matches(&input.email, is_valid_email)
        })
        .required("phone", |input| &input.phone)
        .refine("phone", "must be a valid phone number", |input, _| {
            optional_matches(&input.phone, is_valid_phone)
        })
        .required("address", |input| &input.address)
        .nested(
            "address",
            |input| input.address.as_ref(),
            |input| input.address.as_mut(),
            address(),
        )
        .required("hasPreviousAddress", |input| &input.has_previous_address)
        .gated(
            "previousAddress",
            |input| input.has_previous_address == Some(true),
            |input| &input.previous_address,
            |input| &mut input.previous_address,
        )
        .nested(
            "previousAddress",
            |input| input.previous_address.as_ref(),
            |input| input.previous_address.as_mut(),
            address(),
        )
}

pub(crate) fn availability() -> StepSchema<AvailabilityInput> {
    StepSchema::<AvailabilityInput>::new().at_least_one(
        "availability",
        "select at least one day",
        |input| input.availability.days().to_vec(),
    )
}

pub(crate) fn disability() -> StepSchema<DisabilityInput> {
    StepSchema::<DisabilityInput>::new()
        .required("hasDisability", |input| &input.has_disability)
        .gated(
            "disabilityDetails",
            |input| input.has_disability == Some(true),
            |input| &input.disability_details,
            |input| &mut input.disability_details,
        )
        .required("needsReasonableAdjustment", |input| {
            &input.needs_reasonable_adjustment
        })
        .gated(
            "reasonableAdjustmentDetails",
            |input| input.needs_reasonable_adjustment == Some(true),
            |input| &input.reasonable_adjustment_details,
            |input| &mut input.reasonable_adjustment_details,
        )
}

fn referee() -> StepSchema<Referee> {
    StepSchema::<Referee>::new()
        .required("name", |referee| &referee.name)
        .required("organisation", |referee| &referee.organisation)
        .required("email", |referee| &referee.email)
        .refine("email", "must be a valid email address", |referee, _| {
            optional_matches(&referee.email, is_valid_email)
        })
        .refine("phone", "must be a valid phone number", |referee, _| {
            optional_matches(&referee.phone, is_valid_phone)
        })
        .required("relationship", |referee| &referee.relationship)
        .gated(
            "otherRelationship",
            |referee| referee.relationship == Some(RefereeRelationship::Other),
            |referee| &referee.other_relationship,
            |referee| &mut referee.other_relationship,
        )
        .gated(
            "reemployReason",
            |referee| referee.would_reemploy == Some(YesNo::No),
            |referee| &referee.reemploy_reason,
            |referee| &mut referee.reemploy_reason,
        )
}

fn same_email(left: &Option<Referee>, right: &Option<Referee>) -> bool {
    let email = |referee: &Option<Referee>| {
        referee
            .as_ref()
            .and_then(|referee| referee.email.as_deref())
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
    };

    matches!((email(left), email(right)), (Some(a), Some(b)) if a == b)
}

pub(crate) fn referees() -> StepSchema<RefereesInput> {
    StepSchema::<RefereesInput>::new()
        .required("referees.first", |input| &input.referees.first)
        .required("referees.second", |input| &input.referees.second)
        .nested(
            "referees.first",
            |input| input.referees.first.as_ref(),
            |input| input.referees.first.as_mut(),
            referee(),
        )
        .nested(
            "referees.second",
            |input| input.referees.second.as_ref(),
            |input| input.referees.second.as_mut(),
            referee(),
        )
        .nested(
            "referees.personal",
            |input| input.referees.personal.as_ref(),
            |input| input.referees.personal.as_mut(),
            referee(),
        )
        .refine(
            "referees.second.email",
            "must differ from the first referee",
            |input, _| !same_email(&input.referees.first, &input.referees.second),
        )
}

/// Checks documents already attached to the record; the screen itself carries no payload.
pub(crate) fn documents() -> StepSchema<()> {
    DocumentKind::required().fold(StepSchema::<()>::new(), |schema, kind| {
        schema.check(kind.key(), move |_, context| {
            if context.pending_uploads.contains(&kind) {
                Some("upload in progress".to_string())
            } else if !context.record.has_document(kind) {
                Some(format!("{} is required", kind.label()))
            } else {
                None
            }
        })
    })
}

fn declaration_flags() -> StepSchema<Declarations> {
    StepSchema::<Declarations>::new()
        .refine("informationAccurate", "must be confirmed", |flags, _| {
            flags.information_accurate
        })
        .refine("dataProcessingConsent", "must be given", |flags, _| {
            flags.data_processing_consent
        })
        .refine("roaDeclaration", "must be acknowledged", |flags, _| {
            flags.roa_declaration
        })
        .required("criminalConviction", |flags| &flags.criminal_conviction)
        .gated(
            "criminalConvictionDetails",
            |flags| flags.criminal_conviction == Some(true),
            |flags| &flags.criminal_conviction_details,
            |flags| &mut flags.criminal_conviction_details,
        )
}

pub(crate) fn declarations() -> StepSchema<DeclarationsInput> {
    StepSchema::<DeclarationsInput>::new().nested(
        "declarations",
        |input| Some(&input.declarations),
        |input| Some(&mut input.declarations),
        declaration_flags(),
    )
}

pub(crate) fn review() -> StepSchema<ReviewInput> {
    StepSchema::<ReviewInput>::new().refine("confirmed", "confirm the application before submitting", |input, _| {
        input.confirmed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nhs_number_checksum() {
        assert!(is_valid_nhs_number("943 476 5919"));
        assert!(!is_valid_nhs_number("943 476 5918"));
        assert!(!is_valid_nhs_number("12345"));
    }

    #[test]
    fn national_insurance_format() {
        assert!(is_valid_national_insurance("AB123456C"));
        assert!(is_valid_national_insurance("ab 12 34 56 c"));
        assert!(!is_valid_national_insurance("GB123456C"));
        assert!(!is_valid_national_insurance("AB123456E"));
        assert!(!is_valid_national_insurance("DA123456C"));
    }

    #[test]
    fn contact_formats() {
        assert!(is_valid_email("jane.doe@example.org"));
        assert!(!is_valid_email("jane.doe@"));
        assert!(is_valid_phone("+44 (0)20 7946 0958"));
        assert!(!is_valid_phone("call me"));
        assert!(is_valid_postcode("SW1A 1AA"));
        assert!(is_valid_postcode("m11ae"));
        assert!(!is_valid_postcode("12345"));
    }
}
