use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::twitter_client::retry::RetryPolicy;
use crate::twitter_client::{TwitterApi, TwitterClient};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// An API handle whose owner has been identified. Immutable for the duration of a run.
pub struct Session {
    api: Arc<dyn TwitterApi>,
    identity: Identity,
}

impl Session {
    /// Validates `credentials` before anything touches the network, then builds the client
    /// with `connect` and resolves who it belongs to.
    pub async fn authenticate<F>(
        credentials: &Credentials,
        retry: &RetryPolicy,
        connect: F,
    ) -> Result<Self, AuthError>
    where
        F: FnOnce(&Credentials) -> Arc<dyn TwitterApi>,
    {
        credentials.validate()?;
        let api = connect(credentials);
        let identity = resolve_identity(api.as_ref(), retry).await?;
        info!(
            user_id = %identity.user_id,
            "successfully authenticated as @{}", identity.username
        );
        Ok(Self { api, identity })
    }

    pub async fn connect(credentials: &Credentials, config: &Config) -> Result<Self, AuthError> {
        let connect = |credentials: &Credentials| -> Arc<dyn TwitterApi> {
            Arc::new(TwitterClient::new(credentials, config))
        };
        Self::authenticate(credentials, &config.retry, connect).await
    }

    #[cfg(test)]
    pub(crate) fn from_parts(api: Arc<dyn TwitterApi>, identity: Identity) -> Self {
        Self { api, identity }
    }

    /// Asks the API again who this session belongs to.
    pub async fn resolve_identity(&self, retry: &RetryPolicy) -> Result<Identity, AuthError> {
        resolve_identity(self.api.as_ref(), retry).await
    }

    pub fn api(&self) -> &dyn TwitterApi {
        self.api.as_ref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Rate limits and transient failures are waited out according to `retry`.
pub async fn resolve_identity(
    api: &dyn TwitterApi,
    retry: &RetryPolicy,
) -> Result<Identity, AuthError> {
    let resp = retry.run("me", || api.me()).await.map_err(|err| {
        error!(error = %err, "could not resolve the authenticated user");
        AuthError::RemoteRejected(err.to_string())
    })?;

    if let Some(problems) = resp.errors.filter(|problems| !problems.is_empty()) {
        let detail = problems
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join("; ");
        error!(%detail, "authentication failed");
        return Err(AuthError::RemoteRejected(detail));
    }

    let user = resp.data.ok_or_else(|| {
        error!("authentication failed: /2/users/me returned no data");
        AuthError::RemoteRejected(String::from("no user data returned"))
    })?;

    Ok(Identity {
        user_id: user.id,
        username: user.username,
    })
}
