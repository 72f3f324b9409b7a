use std::time::Duration;

use rand::{rngs::OsRng, RngCore};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ClientError, Dialog, Entity, Message, MessagingClient, PeerRef, SentMessage, User};
use crate::config::Config;

const RETRY_BACKOFF_MS: u64 = 500;

pub struct GatewayClient {
    base_url: String,
    http: Client,
    api_id: i32,
    api_hash: String,
    session: Option<String>,
    connection_retries: u32,
}

impl GatewayClient {
    pub fn new(
        config: &Config,
        api_id: i32,
        api_hash: &str,
        session: Option<String>,
    ) -> Result<Self, ClientError> {
        Url::parse(&config.gateway_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            http,
            api_id,
            api_hash: api_hash.to_string(),
            session: session.filter(|session| !session.trim().is_empty()),
            connection_retries: config.connection_retries,
        })
    }

    /// The gateway may hand back a fresh session string, which replaces ours.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let mut attempt = 0u32;
        loop {
            let mut payload = Map::new();
            payload.insert("apiId".to_string(), json!(self.api_id));
            payload.insert("apiHash".to_string(), json!(self.api_hash));
            match self.call::<ConnectResult>("connect", payload).await {
                Ok(result) => {
                    if let Some(session) = result.session.filter(|session| !session.is_empty()) {
                        self.session = Some(session);
                    }
                    info!(attempt, "connected to gateway");
                    return Ok(());
                }
                Err(ClientError::Http(error)) if attempt < self.connection_retries => {
                    attempt += 1;
                    warn!(attempt, %error, "connect failed, retrying");
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    pub async fn is_authorized(&self) -> Result<bool, ClientError> {
        let result: AuthorizedResult = self.call("isAuthorized", Map::new()).await?;
        Ok(result.authorized)
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let _: Value = self.call("disconnect", Map::new()).await?;
        info!("disconnected from gateway");
        Ok(())
    }

    pub async fn send_code(
        &self,
        phone_number: &str,
        device_model: Option<&str>,
    ) -> Result<SendCodeResult, ClientError> {
        let mut payload = Map::new();
        payload.insert("phoneNumber".to_string(), json!(phone_number));
        if let Some(device_model) = device_model {
            payload.insert("deviceModel".to_string(), json!(device_model));
        }
        self.call("sendCode", payload).await
    }

    pub async fn sign_in(
        &self,
        phone_number: &str,
        phone_code_hash: &str,
        phone_code: &str,
    ) -> Result<SignInResult, ClientError> {
        let mut payload = Map::new();
        payload.insert("phoneNumber".to_string(), json!(phone_number));
        payload.insert("phoneCodeHash".to_string(), json!(phone_code_hash));
        payload.insert("phoneCode".to_string(), json!(phone_code));
        self.call("signIn", payload).await
    }

    pub async fn check_password(&self, password: &str) -> Result<SignInResult, ClientError> {
        let mut payload = Map::new();
        payload.insert("password".to_string(), json!(password));
        self.call("checkPassword", payload).await
    }

    pub async fn export_session(&self) -> Result<String, ClientError> {
        let result: ExportSessionResult = self.call("exportSession", Map::new()).await?;
        Ok(result.session)
    }

    pub async fn get_me(&self) -> Result<User, ClientError> {
        let result: GetMeResult = self.call("getMe", Map::new()).await?;
        Ok(result.user)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Map<String, Value>,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{method}", self.base_url);
        debug!(method, "gateway request");
        let mut request = self.http.post(url).json(&payload);
        if let Some(session) = self.session.as_deref() {
            request = request.bearer_auth(session);
        }
        let response = request.send().await?;
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
            StatusCode::NOT_FOUND => return Err(ClientError::NotFound(format!("{method} returned 404"))),
            status if !status.is_success() => return Err(ClientError::Status(status.as_u16())),
            _ => {}
        }
        let api_response: ApiResponse<T> = response.json().await?;
        match api_response {
            ApiResponse::Ok { result, .. } => Ok(result),
            ApiResponse::Err {
                error,
                description,
                ..
            } => Err(api_error(error, description)),
        }
    }
}

impl MessagingClient for GatewayClient {
    async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError> {
        let mut payload = Map::new();
        payload.insert("limit".to_string(), json!(limit));
        let result: GetDialogsResult = self.call("getDialogs", payload).await?;
        Ok(result.dialogs)
    }

    async fn lookup_entity(&self, identifier: &str) -> Result<Entity, ClientError> {
        let mut payload = Map::new();
        payload.insert("identifier".to_string(), json!(identifier));
        let result: GetEntityResult = self.call("getEntity", payload).await?;
        Ok(result.entity)
    }

    async fn get_messages(&self, peer: &PeerRef, limit: usize) -> Result<Vec<Message>, ClientError> {
        let mut payload = Map::new();
        payload.insert("peer".to_string(), json!(peer));
        payload.insert("limit".to_string(), json!(limit));
        let result: GetMessagesResult = self.call("getMessages", payload).await?;
        Ok(result.messages)
    }

    async fn send_message(&self, peer: &PeerRef, text: &str) -> Result<SentMessage, ClientError> {
        let mut rng = OsRng;
        let random_id = rng.next_u64() as i64;
        let mut payload = Map::new();
        payload.insert("peer".to_string(), json!(peer));
        payload.insert("message".to_string(), json!(text));
        payload.insert("randomId".to_string(), json!(random_id));
        self.call("sendMessage", payload).await
    }
}

fn api_error(error: String, description: Option<String>) -> ClientError {
    let description = description.unwrap_or_else(|| "Unknown error".to_string());
    match error.as_str() {
        "NOT_FOUND" | "USERNAME_NOT_OCCUPIED" | "PEER_ID_INVALID" => ClientError::NotFound(description),
        "AUTH_KEY_UNREGISTERED" | "SESSION_REVOKED" => ClientError::Unauthorized,
        _ => ClientError::Api { error, description },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResult {
    #[serde(default)]
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizedResult {
    authorized: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResult {
    pub phone_code_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResult {
    #[serde(default)]
    pub password_required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportSessionResult {
    session: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetMeResult {
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetDialogsResult {
    dialogs: Vec<Dialog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEntityResult {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetMessagesResult {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
enum ApiResponse<T> {
    Ok { ok: bool, result: T },
    Err {
        ok: bool,
        error: String,
        error_code: Option<i32>,
        description: Option<String>,
    },
}
