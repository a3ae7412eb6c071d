use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Key/secret pair sent with every request.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) key: String,
    pub(crate) secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key_header(&self) -> String {
        format!("Key {}", self.key)
    }

    pub fn secret_header(&self) -> String {
        format!("Secret {}", self.secret)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"***")
            .field("secret", &"***")
            .finish()
    }
}

/// Status code and unparsed body of a response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Multipart fields of a generation request.
#[derive(Debug, Clone)]
pub struct SubmitForm {
    pub model_id: u32,
    /// Serialized generation parameters.
    pub params: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, credentials: &Credentials) -> Result<RawResponse>;

    async fn post_form(
        &self,
        url: &str,
        credentials: &Credentials,
        form: SubmitForm,
    ) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        credentials: &Credentials,
    ) -> Result<RawResponse> {
        let response = request
            .header("X-Key", credentials.key_header())
            .header("X-Secret", credentials.secret_header())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, credentials: &Credentials) -> Result<RawResponse> {
        self.send(self.client.get(url), credentials).await
    }

    async fn post_form(
        &self,
        url: &str,
        credentials: &Credentials,
        form: SubmitForm,
    ) -> Result<RawResponse> {
        let params = Part::bytes(form.params).mime_str("application/json")?;
        let form = Form::new()
            .text("model_id", form.model_id.to_string())
            .part("params", params);
        self.send(self.client.post(url).multipart(form), credentials)
            .await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str, credentials: &Credentials) -> Result<RawResponse> {
        (**self).get(url, credentials).await
    }

    async fn post_form(
        &self,
        url: &str,
        credentials: &Credentials,
        form: SubmitForm,
    ) -> Result<RawResponse> {
        (**self).post_form(url, credentials, form).await
    }
}
