use crate::error::AppResult;
use crate::profile::repo::ProfileRepo;
use crate::profile::ProfileId;
use crate::System;

use itertools::Itertools;

const FALLBACK_SLUG: &str = "profile";

/// Lowercase, hyphen separated, ASCII only. Letters outside ASCII are transliterated.
///
/// `"Jane  Doe"` becomes `"jane-doe"`, `"Jane_99"` becomes `"jane_99"`
/// and `"Zoë"` becomes `"zoe"`.
pub fn slugify(input: &str) -> String {
    deunicode::deunicode(input)
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .join("-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// Pick a slug for a profile that no other profile uses.
///
/// The full name is used when both names are present, the username otherwise.
/// Collisions get a random suffix until the slug is free. `owner` is the
/// profile the slug is for, whose current slug doesn't count as a collision.
pub(crate) async fn unique_slug(
    deps: &(impl ProfileRepo + System),
    first_name: &str,
    last_name: &str,
    username: &str,
    owner: Option<ProfileId>,
) -> AppResult<String> {
    let mut slug = if !first_name.is_empty() && !last_name.is_empty() {
        slugify(&format!("{first_name}{last_name}"))
    } else {
        slugify(username)
    };

    if slug.is_empty() {
        slug = FALLBACK_SLUG.to_string();
    }

    while deps.slug_taken(&slug, owner).await? {
        slug = slugify(&format!("{slug}{}", deps.random_code()));
    }

    Ok(slug)
}
