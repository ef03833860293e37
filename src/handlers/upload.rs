use crate::{
    config::DEFAULT_LOCATION,
    errors::{AppError, UploadError},
    handlers::{JsonReply, error_reply},
    pipeline::{self, StagedUpload, UploadOutcome, UploadPolicy, UploadRequest, UploadTarget},
    state::SharedState,
    utils::format_bytes,
};
use bytes::Buf;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::io;
use tokio::io::AsyncWriteExt;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub location: Option<String>,
    pub path: Option<String>,
}

pub async fn upload_file(
    query: UploadQuery,
    mut form: FormData,
    state: SharedState,
) -> Result<impl Reply, Rejection> {
    let config = &state.config;
    let location = query.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    let target = config
        .upload_target(location, query.path.as_deref().unwrap_or(""))
        .map_err(|e| {
            tracing::warn!("Refused upload target: {}", e);
            warp::reject::custom(AppError::Location(e))
        })?;

    let mut request = None;

    while let Some(result) = form.next().await {
        let field = result.map_err(|e| {
            tracing::error!("Failed to read field: {}", e);
            warp::reject::custom(AppError::MultipartError)
        })?;

        if field.name() != FILE_FIELD {
            continue;
        }

        let file_name = field.filename().unwrap_or("").to_string();
        match stage_part(&target, field).await {
            Ok(staged) => {
                request = Some(UploadRequest { file_name, staged });
                break;
            }
            Err(e) => return Ok(operational_failure(&e, config.upload.max_size)),
        }
    }

    let Some(request) = request else {
        return Ok(error_reply("No file was uploaded", StatusCode::BAD_REQUEST));
    };

    let size = request.staged.size();
    let policy = UploadPolicy::from_config(config);
    let result = tokio::task::spawn_blocking(move || pipeline::process(request, &target, &policy))
        .await
        .map_err(|e| warp::reject::custom(AppError::TaskFailed(e)))?;

    let reply = match result {
        Ok(UploadOutcome::Success {
            stored_path,
            public_url,
        }) => {
            tracing::info!(
                "Uploaded {} to location {} ({} bytes)",
                stored_path.display(),
                location,
                size
            );
            success_reply(&public_url)
        }
        Ok(UploadOutcome::Rejected { messages }) => {
            let message = messages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            error_reply(&message, StatusCode::BAD_REQUEST)
        }
        Err(e) => operational_failure(&e, config.upload.max_size),
    };

    Ok(reply)
}

/// Stream a multipart part into a temporary file in the location root,
/// counting the bytes as they arrive. The target sub-directory is only
/// created once the rules accept the upload.
async fn stage_part(target: &UploadTarget, mut field: Part) -> Result<StagedUpload, UploadError> {
    let temp = StagedUpload::create_in(target.root())?;
    let mut file = tokio::fs::File::from_std(temp.reopen().map_err(UploadError::Staging)?);

    let mut total_size = 0u64;
    while let Some(chunk_result) = field.data().await {
        let mut chunk = chunk_result.map_err(|e| UploadError::Staging(io::Error::other(e)))?;
        total_size += chunk.remaining() as u64;

        let bytes = chunk.copy_to_bytes(chunk.remaining());
        file.write_all(&bytes).await.map_err(UploadError::Staging)?;
    }
    file.flush().await.map_err(UploadError::Staging)?;

    Ok(StagedUpload::new(temp, total_size))
}

fn success_reply(public_url: &str) -> JsonReply {
    warp::reply::with_status(
        warp::reply::json(&json!({
            "filekey": {
                "url": public_url,
                "id": 1,
            }
        })),
        StatusCode::OK,
    )
}

fn operational_failure(error: &UploadError, max_size: u64) -> JsonReply {
    tracing::error!("Upload failed: {}", error);
    let message = format!(
        "Ensure the upload does NOT exceed the maximum filesize of {}, and that the destination folder (on the webserver) is writable.",
        format_bytes(max_size)
    );
    error_reply(&message, StatusCode::INTERNAL_SERVER_ERROR)
}
