use crate::config::DEFAULT_LOCATION;
use crate::errors::AppError;
use crate::index::{ListingOptions, MAX_DEPTH, list_files};
use crate::state::{MediaKind, SharedState};
use crate::templates::render_injector;
use serde::Deserialize;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InjectorQuery {
    #[serde(default)]
    pub route: String,
}

pub async fn list_images(query: ListingQuery, state: SharedState) -> Result<impl Reply, Rejection> {
    listing(MediaKind::Image, query, state).await
}

pub async fn list_documents(
    query: ListingQuery,
    state: SharedState,
) -> Result<impl Reply, Rejection> {
    listing(MediaKind::Generic, query, state).await
}

async fn listing(
    kind: MediaKind,
    query: ListingQuery,
    state: SharedState,
) -> Result<warp::reply::Json, Rejection> {
    let location = query.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    let root = state
        .config
        .location_root(location)
        .map_err(|e| warp::reject::custom(AppError::Location(e)))?
        .to_path_buf();

    // Directory walks are blocking, keep them off the async workers.
    let entries = tokio::task::spawn_blocking(move || {
        let image = &state.config.image;
        let options = ListingOptions {
            kind,
            max_depth: MAX_DEPTH,
            thumbnail_profile: &image.thumbnail,
            thumb_width: image.thumb_width,
            thumb_height: image.thumb_height,
        };
        list_files(&root, &options, state.thumbnailer.as_ref())
    })
    .await
    .map_err(|e| warp::reject::custom(AppError::TaskFailed(e)))?
    .map_err(|e| {
        tracing::warn!("Listing {} failed: {}", location_label(kind), e);
        warp::reject::custom(AppError::Index(e))
    })?;

    Ok(warp::reply::json(&entries))
}

fn location_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "images",
        MediaKind::Generic => "files",
    }
}

pub async fn injector(
    query: InjectorQuery,
    state: SharedState,
) -> Result<warp::reply::Response, Rejection> {
    match render_injector(&query.route, state.config.upload.max_size) {
        Ok(Some(html)) => Ok(warp::reply::html(html).into_response()),
        Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            Err(warp::reject::custom(AppError::RenderError(e)))
        }
    }
}
