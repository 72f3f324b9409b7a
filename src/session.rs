use thiserror::Error;
use tracing::{info, warn};

use crate::auth::Credentials;
use crate::client::ClientError;
use crate::config::Config;
use crate::gateway::GatewayClient;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not logged in. Run: telegram login")]
    NotLoggedIn,
    #[error("Session expired. Run: telegram login")]
    Expired,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Callers finish with [`Session::close`] on every path.
pub struct Session {
    client: GatewayClient,
}

impl Session {
    pub async fn open(config: &Config, credentials: &Credentials) -> Result<Self, SessionError> {
        let Some((api_id, api_hash)) = credentials.api() else {
            return Err(SessionError::NotLoggedIn);
        };
        if credentials.session.is_none() {
            return Err(SessionError::NotLoggedIn);
        }

        let mut client = GatewayClient::new(config, api_id, api_hash, credentials.session.clone())?;
        client.connect().await?;

        let authorized = match client.is_authorized().await {
            Ok(authorized) => authorized,
            Err(ClientError::Unauthorized) => false,
            Err(error) => {
                close_quietly(&client).await;
                return Err(error.into());
            }
        };
        if !authorized {
            close_quietly(&client).await;
            return Err(SessionError::Expired);
        }

        info!("session open");
        Ok(Self { client })
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    pub async fn close(self) {
        close_quietly(&self.client).await;
    }
}

async fn close_quietly(client: &GatewayClient) {
    if let Err(error) = client.disconnect().await {
        warn!(%error, "disconnect failed");
    }
}
