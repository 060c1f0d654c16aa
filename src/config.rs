use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(clap::Parser)]
pub struct Config {
    #[clap(long, env)]
    pub database_url: String,

    #[clap(long, env)]
    pub jwt_signing_key: JwtSigningKey,

    #[clap(long, env, default_value = "0.0.0.0:8080")]
    pub listen_address: SocketAddr,

    /// Directory where uploaded avatars are written.
    #[clap(long, env, default_value = "media")]
    pub media_root: PathBuf,

    /// Hide profiles with an unanswered invitation from the invite list.
    #[clap(long, env)]
    pub invite_list_excludes_pending: bool,
}

#[derive(Clone)]
pub struct JwtSigningKey(pub hmac::Hmac<sha2::Sha384>);

impl std::str::FromStr for JwtSigningKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use hmac::Mac;

        Ok(Self(
            hmac::Hmac::<sha2::Sha384>::new_from_slice(s.as_bytes())
                .map_err(|e| format!("Failed to parse hmac: {e:?}"))?,
        ))
    }
}
