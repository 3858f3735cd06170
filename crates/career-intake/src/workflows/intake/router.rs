use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::controller::WizardError;
use super::documents::{DocumentKind, DocumentStore, UploadError, UploadFile};
use super::gateway::SubmissionGateway;
use super::input::StepInput;
use super::service::{SessionError, SessionId, WizardSessions};

type Sessions<G, D> = State<Arc<WizardSessions<G, D>>>;

/// Router exposing wizard sessions to remote renderers.
pub fn intake_router<G, D>(sessions: Arc<WizardSessions<G, D>>) -> Router
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/intake/steps", get(steps_handler::<G, D>))
        .route("/api/v1/intake/sessions", post(create_handler::<G, D>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(session_handler::<G, D>).delete(abandon_handler::<G, D>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/next",
            post(next_handler::<G, D>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/back",
            post(back_handler::<G, D>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/skip",
            post(skip_handler::<G, D>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/documents/:kind",
            post(upload_handler::<G, D>).delete(remove_document_handler::<G, D>),
        )
        .with_state(sessions)
}

fn error_response(error: SessionError) -> Response {
    let status = match &error {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Busy(_) => StatusCode::CONFLICT,
        SessionError::Wizard(wizard) => match wizard {
            WizardError::Validation(errors) => {
                let payload = json!({
                    "error": "step input is invalid",
                    "fieldErrors": errors,
                });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
            }
            WizardError::UnexpectedSection { .. }
            | WizardError::NotSkippable(_)
            | WizardError::Finished
            | WizardError::Upload(UploadError::UnknownTicket(_)) => StatusCode::CONFLICT,
            WizardError::Upload(UploadError::EmptyFile) => StatusCode::UNPROCESSABLE_ENTITY,
            WizardError::Submission(_) | WizardError::Upload(_) => StatusCode::BAD_GATEWAY,
            WizardError::StepTable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn steps_handler<G, D>(State(sessions): Sessions<G, D>) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    (StatusCode::OK, axum::Json(sessions.steps().clone())).into_response()
}

pub(crate) async fn create_handler<G, D>(State(sessions): Sessions<G, D>) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    let view = sessions.create();
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn session_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path(session_id): Path<String>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions.get(&SessionId(session_id)).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn next_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path(session_id): Path<String>,
    axum::Json(input): axum::Json<StepInput>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions.next(&SessionId(session_id), input).await {
        Ok((transition, view)) => {
            let payload = json!({
                "transition": transition,
                "session": view,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn back_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path(session_id): Path<String>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions.back(&SessionId(session_id)).await {
        Ok((transition, view)) => {
            let payload = json!({
                "transition": transition,
                "session": view,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn skip_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path(session_id): Path<String>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions.skip(&SessionId(session_id)).await {
        Ok((transition, view)) => {
            let payload = json!({
                "transition": transition,
                "session": view,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn abandon_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path(session_id): Path<String>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions.abandon(&SessionId(session_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    filename: Option<String>,
}

pub(crate) async fn upload_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path((session_id, kind)): Path<(String, DocumentKind)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let file = UploadFile {
        file_name: query.filename.unwrap_or_else(|| kind.key().to_string()),
        content_type,
        bytes: body.to_vec(),
    };

    match sessions.upload(&SessionId(session_id), kind, file).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveDocumentQuery {
    url: String,
}

pub(crate) async fn remove_document_handler<G, D>(
    State(sessions): Sessions<G, D>,
    Path((session_id, kind)): Path<(String, DocumentKind)>,
    Query(query): Query<RemoveDocumentQuery>,
) -> Response
where
    G: SubmissionGateway + 'static,
    D: DocumentStore + 'static,
{
    match sessions
        .remove_document(&SessionId(session_id), kind, &query.url)
        .await
    {
        Ok((removed, view)) => {
            let payload = json!({
                "removed": removed,
                "session": view,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
