use crate::cli::actions::Action;
use crate::whisperwall::{
    self,
    auth::{google::GoogleOAuth, AuthConfig},
};
use anyhow::{Context, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            google_client_id,
            google_client_secret,
            public_url,
            assets_dir,
        } => {
            let public_url = Url::parse(&public_url).context("invalid --public-url")?;

            // The provider only ever redirects to this fixed callback.
            let redirect_uri = public_url
                .join("/auth/google/secrets")
                .context("failed to build OAuth callback URL")?;

            let config = AuthConfig::new()
                .with_session_cookie_secure(public_url.scheme() == "https");

            let google = GoogleOAuth::new(google_client_id, google_client_secret, redirect_uri)?;

            whisperwall::new(port, dsn, config, google, assets_dir).await?;
        }
    }

    Ok(())
}
