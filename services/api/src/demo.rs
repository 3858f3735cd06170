use crate::infra::{InMemoryDocumentStore, InMemorySubmissionGateway};
use career_intake::error::AppError;
use career_intake::workflows::intake::{
    Address, Availability, AvailabilityInput, ContactInput, CurrentEmployment,
    CurrentEmploymentInput, Cursor, DateOfBirthInput, Declarations, DeclarationsInput,
    DisabilityInput, DocumentKind, EducationEntry, EducationInput, NameInput,
    NationalInsuranceInput, NhsNumberInput, PreviousEmployment, PreviousEmploymentInput,
    ProfilePictureInput, Referee, RefereeRelationship, Referees, RefereesInput, ReviewInput,
    RoleInput, Section, StepInput, StepTable, Transition, UploadFile, WizardController,
    WizardError, WizardPhase, YesNo,
};
use chrono::{Days, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Have the in-memory backend refuse the first submission attempt.
    #[arg(long)]
    pub(crate) fail_first_submission: bool,
    /// Evaluate date rules against this day (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the optional profile picture step.
    #[arg(long)]
    pub(crate) skip_picture: bool,
}

pub(crate) fn print_step_table() {
    let table = StepTable::standard();
    println!("Application wizard ({} steps)", table.total_steps());
    for step in table.steps() {
        println!("{}. {}", step.position, step.label);
        if step.has_sub_steps() {
            for (index, screen) in step.screens.iter().enumerate() {
                println!("   {}.{} {}", step.position, index + 1, screen.label);
            }
        } else if step.screens.iter().any(|screen| screen.skippable) {
            println!("   (optional)");
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        fail_first_submission,
        today,
        skip_picture,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let failures = usize::from(fail_first_submission);
    let gateway = Arc::new(InMemorySubmissionGateway::failing_first(failures));
    let documents = InMemoryDocumentStore::default();
    let mut wizard = WizardController::new(Arc::clone(&gateway)).with_today(today);

    println!("Career application intake demo");
    println!("Evaluating dates as of {}", today);

    loop {
        let section = match wizard.current_screen() {
            Some(screen) => screen.section,
            None => break,
        };

        if section == Section::ProfilePicture && skip_picture {
            let transition = wizard.skip().await?;
            print_transition(section, "skipped", &transition);
            continue;
        }

        if section == Section::Documents {
            for kind in DocumentKind::required() {
                wizard.upload(&documents, kind, demo_file(kind)).await?;
                println!("  uploaded {}", kind.label());
            }
        }

        let input = scripted_input(section, today);
        let transition = match wizard.next(input.clone()).await {
            Ok(transition) => transition,
            Err(WizardError::Submission(err)) => {
                println!("  submission failed: {}; retrying once", err);
                wizard.next(input).await?
            }
            Err(err) => return Err(err.into()),
        };
        print_transition(section, "completed", &transition);
    }

    match wizard.phase() {
        WizardPhase::Submitted { application_id } => {
            println!("\nApplication {} submitted", application_id);
        }
        other => println!("\nWizard finished in unexpected phase {:?}", other),
    }

    for record in gateway.records() {
        let json = serde_json::to_string_pretty(&record)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        println!("Submitted record for {}:\n{}", record.display_name(), json);
    }

    Ok(())
}

fn print_transition(section: Section, verb: &str, transition: &Transition) {
    match transition {
        Transition::Moved { from, to } => println!(
            "[{} -> {}] {} {}",
            cursor_label(*from),
            cursor_label(*to),
            section.label(),
            verb
        ),
        Transition::Stayed { at } => {
            println!("[{}] {} unchanged", cursor_label(*at), section.label())
        }
        Transition::Submitted { application_id } => {
            println!("[submit] {} {} as {}", section.label(), verb, application_id)
        }
    }
}

fn cursor_label(cursor: Cursor) -> String {
    match cursor.sub_position {
        Some(sub) => format!("{}.{}", cursor.position, sub),
        None => cursor.position.to_string(),
    }
}

fn demo_file(kind: DocumentKind) -> UploadFile {
    UploadFile {
        file_name: format!("{}.pdf", kind.key()),
        content_type: "application/pdf".to_string(),
        bytes: format!("%PDF-1.7 demo {}", kind.key()).into_bytes(),
    }
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn demo_referee(name: &str, email: &str, relationship: RefereeRelationship) -> Referee {
    Referee {
        name: text(name),
        job_title: text("Registered Manager"),
        organisation: text("Riverside Care Home"),
        email: text(email),
        phone: text("0161 496 0101"),
        relationship: Some(relationship),
        other_relationship: None,
        would_reemploy: Some(YesNo::Yes),
        reemploy_reason: None,
    }
}

fn scripted_input(section: Section, today: NaiveDate) -> StepInput {
    match section {
        Section::ProfilePicture => StepInput::ProfilePicture(ProfilePictureInput {
            profile_picture_url: text("https://cdn.example.test/avatars/jordan.png"),
        }),
        Section::Name => StepInput::Name(NameInput {
            title: text("Mx"),
            first_name: text("Jordan"),
            middle_name: None,
            last_name: text("Okafor"),
        }),
        Section::DateOfBirth => StepInput::DateOfBirth(DateOfBirthInput {
            date_of_birth: ymd(1992, 9, 14),
        }),
        Section::NationalInsurance => StepInput::NationalInsurance(NationalInsuranceInput {
            national_insurance_number: text("JH123456C"),
        }),
        Section::NhsNumber => StepInput::NhsNumber(NhsNumberInput {
            nhs_number: text("943 476 5919"),
        }),
        Section::Education => StepInput::Education(EducationInput {
            education: vec![EducationEntry {
                institution: text("Manchester College"),
                qualification: text("Diploma in Adult Care"),
                award_date: ymd(2013, 7, 1),
                grade: text("Merit"),
                certificate: None,
            }],
        }),
        Section::CurrentEmployment => StepInput::CurrentEmployment(CurrentEmploymentInput {
            is_employed: Some(YesNo::Yes),
            current_employment: Some(CurrentEmployment {
                employer: text("Riverside Care Home"),
                job_title: text("Care Assistant"),
                start_date: ymd(2018, 5, 8),
                duties: text("Personal care, activities and handovers"),
                notice_period: text("1 month"),
            }),
        }),
        Section::PreviousEmployment => StepInput::PreviousEmployment(PreviousEmploymentInput {
            previous_employments: vec![PreviousEmployment {
                employer: text("Salford Home Support"),
                job_title: text("Support Worker"),
                start_date: ymd(2014, 2, 3),
                end_date: ymd(2018, 4, 27),
                reason_for_leaving: text("Moved to residential care"),
                has_employment_gaps: Some(false),
                employment_gaps_explanation: None,
            }],
        }),
        Section::Role => StepInput::Role(RoleInput {
            position_applied_for: text("Senior Care Assistant"),
            preferred_start_date: today.checked_add_days(Days::new(30)),
        }),
        Section::Contact => StepInput::Contact(ContactInput {
            email: text("jordan@example.test"),
            phone: text("07700 900456"),
            address: Some(Address {
                line1: text("22 Canal Street"),
                line2: None,
                town: text("Manchester"),
                county: text("Greater Manchester"),
                postcode: text("M1 3HE"),
            }),
            has_previous_address: Some(false),
            previous_address: None,
        }),
        Section::Availability => StepInput::Availability(AvailabilityInput {
            availability: Availability {
                monday: true,
                tuesday: true,
                friday: true,
                ..Availability::default()
            },
        }),
        Section::Disability => StepInput::Disability(DisabilityInput {
            has_disability: Some(false),
            disability_details: None,
            needs_reasonable_adjustment: Some(false),
            reasonable_adjustment_details: None,
        }),
        Section::Referees => StepInput::Referees(RefereesInput {
            referees: Referees {
                first: Some(demo_referee(
                    "Priya Shah",
                    "priya@example.test",
                    RefereeRelationship::LineManager,
                )),
                second: Some(demo_referee(
                    "Tom Reilly",
                    "tom@example.test",
                    RefereeRelationship::Colleague,
                )),
                personal: None,
            },
        }),
        Section::Documents => StepInput::Documents,
        Section::Declarations => StepInput::Declarations(DeclarationsInput {
            declarations: Declarations {
                information_accurate: true,
                data_processing_consent: true,
                roa_declaration: true,
                criminal_conviction: Some(false),
                criminal_conviction_details: None,
            },
        }),
        Section::Review => StepInput::Review(ReviewInput { confirmed: true }),
    }
}
