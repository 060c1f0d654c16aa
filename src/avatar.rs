use crate::error::{AppResult, Error};
use crate::GetConfig;

use anyhow::Context;
use bytes::Bytes;
use entrait::entrait;
use std::path::Path;

const AVATAR_DIR: &str = "avatars";
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// An uploaded avatar image, as received from the client.
#[derive(Clone, Debug)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Write the image under the media root and return its path relative to it.
#[entrait(pub StoreAvatar, mock_api=StoreAvatarMock)]
async fn store_avatar(deps: &impl GetConfig, upload: AvatarUpload) -> AppResult<String> {
    let extension = Path::new(&upload.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            Error::unprocessable_entity([(
                "avatar",
                format!("file extension must be one of {}", IMAGE_EXTENSIONS.join(", ")),
            )])
        })?;

    if upload.bytes.is_empty() {
        return Err(Error::unprocessable_entity([(
            "avatar",
            "the submitted file is empty",
        )]));
    }

    let dir = deps.media_root().join(AVATAR_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("could not create {}", dir.display()))?;

    let file_name = format!("{}.{extension}", uuid::Uuid::new_v4().simple());
    let path = dir.join(&file_name);
    tokio::fs::write(&path, &upload.bytes)
        .await
        .with_context(|| format!("could not write {}", path.display()))?;

    tracing::debug!(path = %path.display(), "stored avatar");

    Ok(format!("{AVATAR_DIR}/{file_name}"))
}

/// Remove a stored avatar that no profile ended up referring to.
#[entrait(pub DiscardAvatar, mock_api=DiscardAvatarMock)]
async fn discard_avatar(deps: &impl GetConfig, relative: &str) {
    let path = deps.media_root().join(relative);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), "could not remove unused avatar: {err}");
    }
}
