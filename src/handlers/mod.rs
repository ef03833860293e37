pub mod media;
pub mod upload;

use crate::errors::{AppError, IndexError};
use serde_json::json;
use std::convert::Infallible;
use subtle::ConstantTimeEq;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

/// `{"error": true, "message": ...}` with the given status.
pub fn error_reply(message: &str, status: StatusCode) -> JsonReply {
    warp::reply::with_status(
        warp::reply::json(&json!({
            "error": true,
            "message": message,
        })),
        status,
    )
}

/// Require `Authorization: Bearer <token>` when a token is configured.
pub fn with_access(token: String) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| {
            let token = token.clone();
            async move {
                if token.is_empty() {
                    return Ok(());
                }
                let presented = header
                    .as_deref()
                    .and_then(|value| value.strip_prefix("Bearer "));
                if presented.is_some_and(|presented| secure_compare(presented, &token)) {
                    Ok(())
                } else {
                    tracing::warn!("Refused request without a valid access token");
                    Err(warp::reject::custom(AppError::Forbidden))
                }
            }
        })
        .untuple_one()
}

/// Compare tokens without leaking how many leading bytes match.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(app_error) = err.find::<AppError>() {
        match app_error {
            AppError::Forbidden => (StatusCode::FORBIDDEN, app_error.to_string()),
            AppError::Location(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Index(IndexError::RootNotFound(_) | IndexError::NotADirectory(_)) => (
                StatusCode::NOT_FOUND,
                "The location directory does not exist".to_string(),
            ),
            AppError::MultipartError => (
                StatusCode::BAD_REQUEST,
                "The upload could not be read".to_string(),
            ),
            AppError::Index(IndexError::IoError(_))
            | AppError::RenderError(_)
            | AppError::TaskFailed(_) => {
                tracing::error!("Request failed: {}", app_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "The upload exceeds the maximum request size".to_string(),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(error_reply(&message, status))
}
