use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::intake::{Blob, BlobId, RejectedFile};
use crate::models::{AppState, IntakeView, UploadResult};

fn view(state: &AppState) -> IntakeView {
    IntakeView {
        files: state.intake.snapshot(),
        max_files: state.intake.max_files(),
        accepting: !state.policy.is_disabled(state.intake.len()),
        label: state.intake.uploaded_label(),
    }
}

/// Current selection with previews and progress.
///
/// # Errors
/// Never; the signature matches the other handlers.
pub async fn get(State(state): State<AppState>) -> AppResult<Json<IntakeView>> {
    Ok(Json(view(&state)))
}

async fn read_candidates(multipart: &mut Multipart) -> AppResult<Vec<Blob>> {
    let mut candidates = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("file" | "files" | "image")) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let mime = field.content_type().map_or_else(
            || mime_guess::from_path(&name).first_or_octet_stream().to_string(),
            ToString::to_string,
        );
        let bytes = field.bytes().await?;
        candidates.push(Blob::new(name, mime, bytes));
    }
    Ok(candidates)
}

fn log_rejections(rejected: &[RejectedFile]) {
    for r in rejected {
        tracing::info!(name = %r.name, code = r.code, "upload rejected");
    }
}

/// Drop files onto the selection.
///
/// Accepts a multipart form with fields named `file` (repeatable). Each part
/// runs through the accept policy; what passes is appended until the
/// selection is full.
///
/// # Errors
///
/// Returns an error if the multipart payload cannot be parsed.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResult>> {
    let candidates = read_candidates(&mut multipart).await?;

    let dropped = state.policy.sort(candidates, state.intake.len());
    log_rejections(&dropped.rejected);
    let accepted = state.intake.add_files(dropped.accepted);

    Ok(Json(UploadResult {
        accepted,
        rejected: dropped.rejected,
    }))
}

/// Swap the whole selection for the uploaded files.
///
/// The policy judges the parts against an empty selection, so a full
/// selection never blocks a replacement. The previous entries go away
/// only once the form has been read in full.
///
/// # Errors
///
/// Returns an error if the multipart payload cannot be parsed.
pub async fn replace(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResult>> {
    let candidates = read_candidates(&mut multipart).await?;

    let dropped = state.policy.sort(candidates, 0);
    log_rejections(&dropped.rejected);
    let accepted = state.intake.replace_files(dropped.accepted);

    Ok(Json(UploadResult {
        accepted,
        rejected: dropped.rejected,
    }))
}

/// Remove one file; 204 when it was not selected.
///
/// # Errors
/// Never; the signature matches the other handlers.
pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    Ok(state.intake.remove_file(BlobId(id)).map_or_else(
        || StatusCode::NO_CONTENT.into_response(),
        |removed| Json(removed).into_response(),
    ))
}

/// # Errors
/// Never; the signature matches the other handlers.
pub async fn clear(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.intake.clear();
    Ok(StatusCode::NO_CONTENT)
}
