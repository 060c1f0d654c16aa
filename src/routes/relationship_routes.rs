use super::{redirect_back, ProfilePk, MY_INVITES};
use crate::auth::Token;
use crate::error::AppResult;
use crate::profile::Profile;
use crate::relationship::Invitations;

use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json};

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct FriendsBody {
    profiles: Vec<Profile>,
}

pub struct RelationshipRoutes<D>(std::marker::PhantomData<D>);

impl<D> RelationshipRoutes<D>
where
    D: crate::relationship::Api + crate::viewer::Api + Sized + Clone + Send + Sync + 'static,
{
    pub fn router() -> axum::Router {
        axum::Router::new()
            .route("/my-invites", get(Self::my_invites))
            .route("/accept-invitation", post(Self::accept_invitation))
            .route("/reject-invitation", post(Self::reject_invitation))
            .route("/send-invitation", post(Self::send_invitation))
            .route("/remove-from-friends", post(Self::remove_from_friends))
            .route("/friends", get(Self::friends))
    }

    async fn my_invites(Extension(deps): Extension<D>, token: Token) -> AppResult<Json<Invitations>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(deps.invitations_received(&viewer).await?))
    }

    async fn accept_invitation(
        Extension(deps): Extension<D>,
        token: Token,
        Form(form): Form<ProfilePk>,
    ) -> AppResult<Redirect> {
        let viewer = deps.resolve_viewer(token).await?;
        deps.accept_invitation(&viewer, form.profile_pk).await?;

        Ok(Redirect::to(MY_INVITES))
    }

    async fn reject_invitation(
        Extension(deps): Extension<D>,
        token: Token,
        Form(form): Form<ProfilePk>,
    ) -> AppResult<Redirect> {
        let viewer = deps.resolve_viewer(token).await?;
        deps.reject_invitation(&viewer, form.profile_pk).await?;

        Ok(Redirect::to(MY_INVITES))
    }

    async fn send_invitation(
        Extension(deps): Extension<D>,
        token: Token,
        headers: HeaderMap,
        Form(form): Form<ProfilePk>,
    ) -> AppResult<Redirect> {
        let viewer = deps.resolve_viewer(token).await?;
        deps.send_invitation(&viewer, form.profile_pk).await?;

        Ok(redirect_back(&headers))
    }

    async fn remove_from_friends(
        Extension(deps): Extension<D>,
        token: Token,
        headers: HeaderMap,
        Form(form): Form<ProfilePk>,
    ) -> AppResult<Redirect> {
        let viewer = deps.resolve_viewer(token).await?;
        deps.remove_from_friends(&viewer, form.profile_pk).await?;

        Ok(redirect_back(&headers))
    }

    async fn friends(Extension(deps): Extension<D>, token: Token) -> AppResult<Json<FriendsBody>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(FriendsBody {
            profiles: deps.list_friends(&viewer).await?,
        }))
    }
}
