mod profile_routes;
mod relationship_routes;

use crate::app::App;
use crate::profile::ProfileId;

use axum::http::header::REFERER;
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::routing::Router;
use entrait::Impl;

const MY_INVITES: &str = "/api/my-invites";
const MY_PROFILE: &str = "/api/my-profile";

/// Axum API router for the real app.
pub fn api_router() -> axum::Router {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(profile_routes::ProfileRoutes::<Impl<App>>::router())
            .merge(relationship_routes::RelationshipRoutes::<Impl<App>>::router()),
    )
}

/// Form body of the invitation actions.
#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct ProfilePk {
    profile_pk: ProfileId,
}

/// Back to the page the action was submitted from.
fn redirect_back(headers: &HeaderMap) -> Redirect {
    let referer = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|referer| !referer.is_empty());

    Redirect::to(referer.unwrap_or(MY_PROFILE))
}
