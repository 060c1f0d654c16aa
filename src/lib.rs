pub mod app;
pub mod config;

mod auth;
mod avatar;
mod db;
mod error;
mod profile;
mod relationship;
mod routes;
mod slug;
mod timestamp;
mod viewer;

#[cfg(test)]
mod test_util;

use anyhow::Context;
use axum::Extension;
use entrait::{entrait, Impl};
use tower::ServiceBuilder;

///
/// Mockable system abstraction
///
#[entrait(mock_api=SystemMock)]
pub trait System {
    fn get_current_time(&self) -> time::OffsetDateTime;

    /// Short random code used to disambiguate colliding slugs.
    fn random_code(&self) -> String;
}

///
/// Mockable config accessor
///
#[entrait(mock_api=GetConfigMock)]
pub trait GetConfig {
    fn get_jwt_signing_key(&self) -> &hmac::Hmac<sha2::Sha384>;

    fn media_root(&self) -> &std::path::PathBuf;

    fn invite_list_excludes_pending(&self) -> bool;
}

pub async fn serve(app: app::App) -> anyhow::Result<()> {
    let listen_address = app.config.listen_address;

    let router = routes::api_router().layer(
        ServiceBuilder::new()
            .layer(Extension(Impl::new(app)))
            // Enables logging. Use `RUST_LOG=tower_http=debug`
            .layer(tower_http::trace::TraceLayer::new_for_http()),
    );

    let listener = tokio::net::TcpListener::bind(listen_address)
        .await
        .with_context(|| format!("could not bind to {listen_address}"))?;

    tracing::info!("listening on {listen_address}");

    axum::serve(listener, router)
        .await
        .context("error running HTTP server")
}
