use crate::config::DEFAULT_LOCATION;
use crate::handlers::{self, media::InjectorQuery, media::ListingQuery, upload::UploadQuery};
use crate::state::SharedState;
use std::convert::Infallible;
use std::path::PathBuf;
use warp::Filter;

// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn routes(
    state: SharedState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let guard = handlers::with_access(state.config.security.access_token.clone());

    let images_route = warp::get()
        .and(warp::path("redactor_images"))
        .and(warp::path::end())
        .and(guard.clone())
        .and(warp::query::<ListingQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::media::list_images);

    let files_route = warp::get()
        .and(warp::path("redactor_files"))
        .and(warp::path::end())
        .and(guard.clone())
        .and(warp::query::<ListingQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::media::list_documents);

    let upload_route = warp::post()
        .and(warp::path("redactor_upload"))
        .and(warp::path::end())
        .and(guard.clone())
        .and(warp::query::<UploadQuery>())
        .and(
            warp::multipart::form()
                .max_length(state.config.upload.max_size + MULTIPART_OVERHEAD),
        )
        .and(with_state(state.clone()))
        .and_then(handlers::upload::upload_file);

    let injector_route = warp::get()
        .and(warp::path("redactor_injector"))
        .and(warp::path::end())
        .and(guard)
        .and(warp::query::<InjectorQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::media::injector);

    // Validation guarantees the default location exists.
    let files_root = state
        .config
        .location_root(DEFAULT_LOCATION)
        .map(PathBuf::from)
        .unwrap_or_default();
    let files_dir = warp::path("files").and(warp::fs::dir(files_root));

    images_route
        .or(files_route)
        .or(upload_route)
        .or(injector_route)
        .or(files_dir)
        .recover(handlers::handle_rejection)
        .with(warp::trace::request())
}

fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
