use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ClientError, ClientResult};
use crate::dto::auth_dto::{LoginPayload, LoginResponse};
use crate::dto::user_dto::{
    MessageResponse, ProfilePictureResponse, UpdateProfilePayload, UserEnvelope, UserResponse,
};

/// Multipart field name the picture is sent under.
pub const PICTURE_FIELD: &str = "profilePicture";

/// A file picked by the user, not yet uploaded.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// The calls the profile page and the session store make against the server.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// The authoritative current user (`GET /api/auth/me`).
    async fn current_user(&self) -> ClientResult<UserResponse>;

    async fn get_profile(&self) -> ClientResult<UserResponse>;

    async fn update_profile(&self, payload: &UpdateProfilePayload) -> ClientResult<UserResponse>;

    /// Returns the stored picture path.
    async fn upload_profile_picture(&self, file: &SelectedFile) -> ClientResult<String>;

    async fn delete_profile_picture(&self) -> ClientResult<()>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// [`ProfileApi`] over HTTP.
#[derive(Clone)]
pub struct HttpProfileApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpProfileApi {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Exchanges credentials for a token; the token is kept for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let payload = LoginPayload {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&payload)
            .send()
            .await?;
        let login: LoginResponse = parse(resp).await?;
        self.token = Some(login.token.clone());
        Ok(login)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.token.as_ref().ok_or(ClientError::NotAuthenticated)?;
        Ok(builder.bearer_auth(token))
    }
}

async fn parse<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or(text);
    tracing::warn!(status = status.as_u16(), "API request failed: {}", message);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn current_user(&self) -> ClientResult<UserResponse> {
        let req = self.authorized(self.client.get(self.url("/api/auth/me")))?;
        let envelope: UserEnvelope = parse(req.send().await?).await?;
        Ok(envelope.user)
    }

    async fn get_profile(&self) -> ClientResult<UserResponse> {
        let req = self.authorized(self.client.get(self.url("/api/users/profile")))?;
        let envelope: UserEnvelope = parse(req.send().await?).await?;
        Ok(envelope.user)
    }

    async fn update_profile(&self, payload: &UpdateProfilePayload) -> ClientResult<UserResponse> {
        let req = self.authorized(self.client.put(self.url("/api/users/profile")))?;
        let envelope: UserEnvelope = parse(req.json(payload).send().await?).await?;
        Ok(envelope.user)
    }

    async fn upload_profile_picture(&self, file: &SelectedFile) -> ClientResult<String> {
        let part = multipart::Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = multipart::Form::new().part(PICTURE_FIELD, part);
        tracing::debug!(name = %file.name, size = file.size(), "Uploading file");

        let req = self.authorized(self.client.post(self.url("/api/users/profile/picture")))?;
        let body: ProfilePictureResponse = parse(req.multipart(form).send().await?).await?;
        Ok(body.profile_picture)
    }

    async fn delete_profile_picture(&self) -> ClientResult<()> {
        let req = self.authorized(self.client.delete(self.url("/api/users/profile/picture")))?;
        let _: MessageResponse = parse(req.send().await?).await?;
        Ok(())
    }
}
