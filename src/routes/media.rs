//! Synchronous file fingerprinting: `POST /code_iscc`.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::download::sanitize_filename;
use crate::error::{ServiceError, ServiceResult};
use crate::gate::{self, UploadSession};
use crate::state::AppState;

/// Fingerprint an uploaded file.
///
/// Multipart fields: `file` (required), `title` and `extra` (optional
/// text). The upload gate sniffs the leading bytes and rejects unsupported
/// content with 415 before the transfer happens; admitted payloads are
/// streamed into a per-request session directory, fingerprinted on the
/// compute pool, and the session is removed on every exit path.
pub async fn code_iscc(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServiceResult<impl IntoResponse> {
    let mut upload: Option<(UploadSession, std::path::PathBuf)> = None;
    let mut title = String::new();
    let mut extra = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServiceError::BadRequest(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "upload".to_string());

                let session = UploadSession::create_in(state.store.dir())?;
                let dest = session.file_path(&filename);
                let admitted = gate::admit_stream(field, &dest).await?;
                tracing::debug!(
                    filename = %filename,
                    mediatype = %admitted.media.mime,
                    bytes = admitted.bytes_written,
                    "upload admitted"
                );
                upload = Some((session, dest));
            }
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|err| ServiceError::BadRequest(format!("invalid title field: {err}")))?;
            }
            Some("extra") => {
                extra = field
                    .text()
                    .await
                    .map_err(|err| ServiceError::BadRequest(format!("invalid extra field: {err}")))?;
            }
            _ => {}
        }
    }

    let Some((session, dest)) = upload else {
        return Err(ServiceError::BadRequest(
            "missing file field in multipart body".to_string(),
        ));
    };

    let result = state.pool.compute(dest, title, extra).await?;

    // Session drop removes the temp directory; explicit here so the
    // cleanup clearly covers the success path too.
    drop(session);
    Ok(Json(result))
}
