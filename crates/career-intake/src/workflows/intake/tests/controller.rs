use std::collections::BTreeSet;
use std::sync::Arc;

use super::common::*;
use crate::workflows::intake::controller::{Transition, WizardController, WizardError, WizardPhase};
use crate::workflows::intake::documents::{DocumentKind, StoredDocument, UploadError, UploadTicket};
use crate::workflows::intake::gateway::{ApplicationId, SubmissionError};
use crate::workflows::intake::input::{
    CurrentEmploymentInput, NameInput, NhsNumberInput, StepInput,
};
use crate::workflows::intake::record::{ApplicationRecord, YesNo};
use crate::workflows::intake::steps::{Cursor, Section, StepTable};
use crate::workflows::intake::validation::StepValidator;

#[test]
fn starts_on_the_first_screen() {
    let wizard = wizard();
    assert_eq!(wizard.phase(), &WizardPhase::AtStep(Cursor::at(1)));
    assert_eq!(
        wizard.current_screen().map(|screen| screen.section),
        Some(Section::ProfilePicture)
    );
    assert_eq!(wizard.record(), &ApplicationRecord::new());
}

#[tokio::test]
async fn invalid_input_neither_merges_nor_moves() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Name).await;
    let before = wizard.record().clone();

    let result = wizard
        .next(StepInput::Name(NameInput {
            title: some("Dr"),
            first_name: some("Grace"),
            ..NameInput::default()
        }))
        .await;

    match result {
        Err(WizardError::Validation(errors)) => assert!(errors.contains("lastName")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(2, 1)));
    assert_eq!(wizard.record(), &before);
    assert!(wizard.field_errors().contains("lastName"));

    wizard
        .next(valid_input(Section::Name))
        .await
        .expect("valid name advances");
    assert!(wizard.field_errors().is_empty());
}

#[tokio::test]
async fn rejects_input_for_another_screen() {
    let mut wizard = wizard();

    match wizard.next(valid_input(Section::Name)).await {
        Err(WizardError::UnexpectedSection { expected, found }) => {
            assert_eq!(expected, Section::ProfilePicture);
            assert_eq!(found, Section::Name);
        }
        other => panic!("expected section mismatch, got {other:?}"),
    }
    assert_eq!(wizard.cursor(), Some(Cursor::at(1)));
}

#[tokio::test]
async fn walks_sub_steps_then_enters_next_step_at_its_first_sub_step() {
    let mut wizard = wizard();
    let mut visited = Vec::new();

    for _ in 0..9 {
        let section = wizard.current_screen().expect("screen").section;
        let transition = wizard
            .next(valid_input(section))
            .await
            .expect("valid input advances");
        match transition {
            Transition::Moved { to, .. } => visited.push(to),
            other => panic!("expected a move, got {other:?}"),
        }
    }

    assert_eq!(
        visited,
        vec![
            Cursor::at_sub(2, 1),
            Cursor::at_sub(2, 2),
            Cursor::at_sub(2, 3),
            Cursor::at_sub(2, 4),
            Cursor::at(3),
            Cursor::at_sub(4, 1),
            Cursor::at_sub(4, 2),
            Cursor::at_sub(5, 1),
            Cursor::at_sub(5, 2),
        ]
    );
}

#[tokio::test]
async fn back_into_a_composite_step_restores_its_last_sub_step() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Education).await;
    assert_eq!(wizard.cursor(), Some(Cursor::at(3)));

    wizard.back().expect("back from step 3");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(2, 4)));
    wizard.back().expect("back within step 2");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(2, 3)));
    wizard.back().expect("back within step 2");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(2, 2)));

    wizard
        .next(valid_input(Section::DateOfBirth))
        .await
        .expect("date of birth advances");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(2, 3)));
}

#[tokio::test]
async fn resume_sub_step_is_tracked_per_step() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Contact).await;
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(5, 2)));
    assert_eq!(wizard.resume_sub_step(4), Some(2));
    assert_eq!(wizard.resume_sub_step(2), Some(4));

    wizard.back().expect("back to role");
    let transition = wizard.back().expect("back into employment");
    assert_eq!(
        transition,
        Transition::Moved {
            from: Cursor::at_sub(5, 1),
            to: Cursor::at_sub(4, 2),
        }
    );
    assert_eq!(wizard.resume_sub_step(5), Some(1));

    wizard
        .next(valid_input(Section::PreviousEmployment))
        .await
        .expect("previous employment advances");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(5, 1)));
}

#[test]
fn back_on_the_first_screen_is_a_no_op() {
    let mut wizard = wizard();
    let transition = wizard.back().expect("back at start");
    assert_eq!(transition, Transition::Stayed { at: Cursor::at(1) });
    assert_eq!(wizard.cursor(), Some(Cursor::at(1)));
}

#[tokio::test]
async fn skip_is_limited_to_skippable_screens_and_clears_their_fields() {
    let mut wizard = wizard();
    wizard
        .next(valid_input(Section::ProfilePicture))
        .await
        .expect("picture accepted");
    assert!(wizard.record().profile_picture_url.is_some());

    match wizard.skip().await {
        Err(WizardError::NotSkippable(Section::Name)) => {}
        other => panic!("expected name to be unskippable, got {other:?}"),
    }

    wizard.back().expect("back to picture");
    let transition = wizard.skip().await.expect("picture is skippable");
    assert_eq!(
        transition,
        Transition::Moved {
            from: Cursor::at(1),
            to: Cursor::at_sub(2, 1),
        }
    );
    assert_eq!(wizard.record().profile_picture_url, None);
}

#[tokio::test]
async fn personal_details_produce_exactly_their_fields() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Education).await;

    let json = serde_json::to_value(wizard.record()).expect("record serializes");
    let keys = object_keys(&json);
    let expected: BTreeSet<String> = [
        "status",
        "profilePictureUrl",
        "title",
        "firstName",
        "lastName",
        "dateOfBirth",
        "nationalInsuranceNumber",
        "nhsNumber",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    assert_eq!(keys, expected);
    assert_eq!(json["status"], "applied");
    assert_eq!(json["dateOfBirth"], "1990-04-12");
}

#[tokio::test]
async fn skipped_picture_and_blank_nhs_number_leave_only_personal_fields() {
    let mut wizard = wizard();
    wizard.skip().await.expect("profile picture is optional");

    for input in [
        StepInput::Name(name_input()),
        StepInput::DateOfBirth(date_of_birth_input()),
        StepInput::NationalInsurance(national_insurance_input()),
        StepInput::NhsNumber(NhsNumberInput { nhs_number: None }),
    ] {
        wizard.next(input).await.expect("personal details advance");
    }

    assert_eq!(wizard.cursor(), Some(Cursor::at(3)));
    let json = serde_json::to_value(wizard.record()).expect("record serializes");
    let expected: BTreeSet<String> = [
        "status",
        "title",
        "firstName",
        "lastName",
        "dateOfBirth",
        "nationalInsuranceNumber",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(object_keys(&json), expected);
}

#[tokio::test]
async fn not_employed_leaves_no_current_employment() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::CurrentEmployment).await;

    wizard
        .next(StepInput::CurrentEmployment(CurrentEmploymentInput {
            is_employed: Some(YesNo::No),
            current_employment: Some(current_job()),
        }))
        .await
        .expect("unemployed applicant advances");

    assert_eq!(wizard.record().is_employed, Some(YesNo::No));
    assert_eq!(wizard.record().current_employment, None);
    let json = serde_json::to_value(wizard.record()).expect("record serializes");
    assert!(json.get("currentEmployment").is_none());
    assert_eq!(json["isEmployed"], "no");
}

#[tokio::test]
async fn completing_the_review_submits_once_and_clears_the_record() {
    let gateway = Arc::new(MemoryGateway::default());
    let mut wizard = wizard_with(Arc::clone(&gateway));
    drive_to(&mut wizard, Section::Review).await;
    assert_eq!(wizard.cursor(), Some(Cursor::at(9)));

    let transition = wizard
        .next(valid_input(Section::Review))
        .await
        .expect("submission succeeds");
    let application_id = ApplicationId("app-000001".to_string());
    assert_eq!(
        transition,
        Transition::Submitted {
            application_id: application_id.clone()
        }
    );
    assert_eq!(wizard.phase(), &WizardPhase::Submitted { application_id });
    assert_eq!(wizard.record(), &ApplicationRecord::new());

    let submitted = gateway.submissions();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].display_name(), "Ms Ada Lovelace");
    assert!(submitted[0].has_document(DocumentKind::Cv));
    assert_eq!(submitted[0].declarations, Some(declarations_input().declarations));

    match wizard.next(valid_input(Section::Review)).await {
        Err(WizardError::Finished) => {}
        other => panic!("expected finished wizard, got {other:?}"),
    }
    assert_eq!(gateway.submissions().len(), 1);
}

#[tokio::test]
async fn failed_submission_keeps_state_for_retry() {
    let gateway = Arc::new(FlakyGateway::failing(1));
    let mut wizard = wizard_with(Arc::clone(&gateway));
    drive_to(&mut wizard, Section::Review).await;

    match wizard.next(valid_input(Section::Review)).await {
        Err(WizardError::Submission(SubmissionError::Transport(_))) => {}
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(wizard.cursor(), Some(Cursor::at(9)));
    assert_eq!(wizard.record().first_name.as_deref(), Some("Ada"));
    assert!(wizard.submission_error().is_some());

    let transition = wizard
        .next(valid_input(Section::Review))
        .await
        .expect("retry succeeds");
    assert!(matches!(transition, Transition::Submitted { .. }));
    assert_eq!(gateway.attempts(), 2);
    assert_eq!(gateway.submissions().len(), 1);
    assert_eq!(wizard.submission_error(), None);
}

#[tokio::test]
async fn leaving_the_review_clears_a_stale_submission_error() {
    let mut wizard = wizard_with(Arc::new(FlakyGateway::failing(1)));
    drive_to(&mut wizard, Section::Review).await;

    assert!(wizard.next(valid_input(Section::Review)).await.is_err());
    assert!(wizard.submission_error().is_some());

    wizard.back().expect("back from review");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(8, 2)));
    assert_eq!(wizard.submission_error(), None);

    wizard
        .next(valid_input(Section::Declarations))
        .await
        .expect("declarations still valid");
    assert_eq!(wizard.cursor(), Some(Cursor::at(9)));
    assert_eq!(wizard.submission_error(), None);
}

#[tokio::test]
async fn abandon_discards_the_record() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Education).await;

    wizard.abandon().expect("abandon in progress wizard");
    assert_eq!(wizard.phase(), &WizardPhase::Abandoned);
    assert_eq!(wizard.record(), &ApplicationRecord::new());
    assert_eq!(wizard.current_screen(), None);

    match wizard.next(valid_input(Section::Education)).await {
        Err(WizardError::Finished) => {}
        other => panic!("expected finished wizard, got {other:?}"),
    }
    assert_eq!(wizard.abandon(), Err(WizardError::Finished));
    assert_eq!(wizard.back(), Err(WizardError::Finished));
}

#[tokio::test]
async fn pending_required_upload_blocks_the_documents_screen() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Documents).await;
    attach_required_documents(&mut wizard).await;

    let ticket = wizard.begin_upload(DocumentKind::Cv).expect("upload starts");
    match wizard.next(StepInput::Documents).await {
        Err(WizardError::Validation(errors)) => {
            assert_eq!(errors.get("documents.cv"), Some("upload in progress"));
        }
        other => panic!("expected pending upload to block, got {other:?}"),
    }

    let kind = wizard
        .complete_upload(
            ticket,
            StoredDocument {
                file_url: document_url("cv-v2.pdf"),
            },
        )
        .expect("ticket settles");
    assert_eq!(kind, DocumentKind::Cv);
    assert_eq!(
        wizard.record().document_urls(DocumentKind::Cv),
        vec![document_url("cv-v2.pdf").as_str()]
    );

    wizard
        .next(StepInput::Documents)
        .await
        .expect("documents complete");
    assert_eq!(wizard.cursor(), Some(Cursor::at_sub(8, 2)));
}

#[tokio::test]
async fn upload_failures_are_kept_per_kind_until_a_later_success() {
    let mut wizard = wizard();
    let ticket = wizard
        .begin_upload(DocumentKind::RightToWork)
        .expect("upload starts");
    wizard
        .fail_upload(ticket, UploadError::Rejected("file too large".to_string()))
        .expect("ticket settles");

    assert!(wizard.pending_uploads().is_empty());
    assert!(wizard.upload_errors()[&DocumentKind::RightToWork].contains("file too large"));
    assert!(!wizard.record().has_document(DocumentKind::RightToWork));

    let store = MemoryDocuments::default();
    wizard
        .upload(&store, DocumentKind::RightToWork, document_file(DocumentKind::RightToWork))
        .await
        .expect("second attempt succeeds");
    assert!(wizard.upload_errors().is_empty());
    assert_eq!(store.stored().len(), 1);

    match wizard.complete_upload(
        ticket,
        StoredDocument {
            file_url: document_url("late.pdf"),
        },
    ) {
        Err(WizardError::Upload(UploadError::UnknownTicket(UploadTicket(_)))) => {}
        other => panic!("expected settled ticket to be rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_upload_through_a_store_is_reported_inline() {
    let mut wizard = wizard();
    let result = wizard
        .upload(&RejectingDocuments, DocumentKind::Cv, document_file(DocumentKind::Cv))
        .await;

    match result {
        Err(WizardError::Upload(UploadError::Rejected(_))) => {}
        other => panic!("expected rejected upload, got {other:?}"),
    }
    assert!(wizard.upload_errors().contains_key(&DocumentKind::Cv));
    assert_eq!(wizard.cursor(), Some(Cursor::at(1)));
}

#[tokio::test]
async fn snapshot_round_trips_through_restore() {
    let mut wizard = wizard();
    drive_to(&mut wizard, Section::Contact).await;
    wizard.back().expect("back to role");

    let snapshot = wizard.snapshot();
    let json = serde_json::to_value(&snapshot).expect("snapshot serializes");
    assert_eq!(json["phase"]["state"], "at_step");
    assert_eq!(json["phase"]["position"], 5);
    assert_eq!(json["phase"]["subPosition"], 1);

    let decoded = serde_json::from_value(json).expect("snapshot deserializes");
    let restored = WizardController::restore(
        Arc::new(StepTable::standard()),
        Arc::new(StepValidator::standard()),
        Arc::new(MemoryGateway::default()),
        decoded,
    )
    .expect("snapshot is consistent with the table")
    .with_today(today());

    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.cursor(), Some(Cursor::at_sub(5, 1)));
    assert_eq!(restored.resume_sub_step(4), Some(2));
}

#[test]
fn restore_rejects_cursors_outside_the_table() {
    let mut snapshot = wizard().snapshot();
    snapshot.phase = WizardPhase::AtStep(Cursor::at_sub(3, 1));

    let result = WizardController::restore(
        Arc::new(StepTable::standard()),
        Arc::new(StepValidator::standard()),
        Arc::new(MemoryGateway::default()),
        snapshot,
    );
    assert!(matches!(result, Err(WizardError::StepTable(_))));
}
