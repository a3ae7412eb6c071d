use crate::error::{KandinskyError, Result};
use crate::image::Image;
use crate::transport::{Credentials, HttpTransport, RawResponse, SubmitForm, Transport};
use crate::types::{
    ApiError, GenerateQuery, GenerationParams, KandinskyOptions, Model, ParamsPayload, TaskHandle,
};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api-key.fusionbrain.ai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_STYLE: &str = "DEFAULT";
/// Model used when `resolve_model` was never called.
pub const DEFAULT_MODEL_ID: u32 = 4;
pub const DEFAULT_DIMENSION: u32 = 1024;
pub const GENERATION_TYPE: &str = "GENERATE";

const MODELS_PATH: &str = "/key/api/v1/models";
const RUN_PATH: &str = "/key/api/v1/text2image/run";
const STATUS_PATH: &str = "/key/api/v1/text2image/status/";

pub struct Kandinsky<T: Transport = HttpTransport> {
    pub(crate) credentials: Credentials,
    pub(crate) base_url: String,
    pub(crate) style: String,
    pub(crate) poll_interval: Duration,
    pub(crate) preferred_model: Option<u32>,
    pub(crate) model: Option<Model>,
    pub(crate) transport: T,
}

impl Kandinsky<HttpTransport> {
    /// Creates a client for the production service with default settings.
    pub fn new(key: &str, secret: &str) -> Result<Self> {
        Self::with_options(KandinskyOptions {
            api_key: Some(key.to_string()),
            api_secret: Some(secret.to_string()),
            ..Default::default()
        })
    }

    pub fn with_options(options: KandinskyOptions) -> Result<Self> {
        let timeout = Duration::from_secs(options.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let transport = HttpTransport::new(timeout)?;
        Self::with_transport(options, transport)
    }

    /// Creates a client from `KAND_API_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::with_options(KandinskyOptions::from_env())
    }
}

impl<T: Transport> Kandinsky<T> {
    pub fn with_transport(options: KandinskyOptions, transport: T) -> Result<Self> {
        let key = options.api_key.unwrap_or_default();
        if key.trim().is_empty() {
            return Err(KandinskyError::EmptyKey);
        }
        let secret = options.api_secret.unwrap_or_default();
        if secret.trim().is_empty() {
            return Err(KandinskyError::EmptySecret);
        }

        let base_url = options
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(KandinskyError::EmptyUrl);
        }

        let style = options
            .style
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STYLE.to_string());
        let poll_interval =
            Duration::from_secs(options.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS));

        Ok(Self {
            credentials: Credentials::new(key, secret),
            base_url,
            style,
            poll_interval,
            preferred_model: options.model_id,
            model: None,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The model resolved by [`resolve_model`](Self::resolve_model), if any.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Id sent with generation requests.
    ///
    /// Falls back to [`DEFAULT_MODEL_ID`] when no model has been resolved.
    pub fn model_id(&self) -> u32 {
        match &self.model {
            Some(m) => m.id,
            None => DEFAULT_MODEL_ID,
        }
    }

    /// Fetches the model list and caches the selected model on the client.
    ///
    /// Selects the configured preferred model when set, otherwise the first
    /// listed one. The cached value is never refreshed implicitly; call this
    /// again to pick up vendor-side changes.
    pub async fn resolve_model(&mut self) -> Result<u32> {
        let url = format!("{}{}", self.base_url, MODELS_PATH);
        let response = self.transport.get(&url, &self.credentials).await?;
        check_status(&response)?;

        let models: Vec<Model> = serde_json::from_slice(&response.body)?;
        let model = match self.preferred_model {
            Some(id) => models.into_iter().find(|m| m.id == id).ok_or_else(|| {
                KandinskyError::ModelResolution(format!("model {} is not available", id))
            })?,
            None => models
                .into_iter()
                .next()
                .ok_or_else(|| KandinskyError::ModelResolution("no models available".into()))?,
        };
        if model.id == 0 {
            return Err(KandinskyError::ModelResolution(
                "service returned a model without an id".into(),
            ));
        }

        log::info!(
            "Resolved Kandinsky model {} ({} {})",
            model.id,
            model.name,
            model.version
        );
        let id = model.id;
        self.model = Some(model);
        Ok(id)
    }

    /// Submits a generation request and returns the task handle.
    ///
    /// An empty prompt is rejected before any request is made.
    pub async fn submit(&self, params: &GenerationParams) -> Result<TaskHandle> {
        let prompt = params.prompt.trim();
        if prompt.is_empty() {
            return Err(KandinskyError::EmptyPrompt);
        }

        let payload = ParamsPayload {
            generation_type: GENERATION_TYPE,
            style: params
                .style
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(self.style.as_str()),
            width: or_default(params.width, DEFAULT_DIMENSION),
            height: or_default(params.height, DEFAULT_DIMENSION),
            num_images: or_default(params.num_images, 1),
            negative_prompt: params
                .negative_prompt
                .as_deref()
                .filter(|s| !s.trim().is_empty()),
            generate_params: GenerateQuery { query: prompt },
        };

        if self.model.is_none() {
            log::warn!(
                "No model resolved, submitting with default model {}",
                DEFAULT_MODEL_ID
            );
        }
        let form = SubmitForm {
            model_id: self.model_id(),
            params: serde_json::to_vec(&payload)?,
        };

        let url = format!("{}{}", self.base_url, RUN_PATH);
        let response = self
            .transport
            .post_form(&url, &self.credentials, form)
            .await?;

        if let Ok(api_error) = serde_json::from_slice::<ApiError>(&response.body) {
            return Err(KandinskyError::Api(api_error));
        }
        check_status(&response)?;

        let handle: TaskHandle = serde_json::from_slice(&response.body)?;
        if handle.uuid.trim().is_empty() {
            return Err(KandinskyError::EmptyTaskId);
        }
        log::info!("Submitted task {} ({})", handle.uuid, handle.status);
        Ok(handle)
    }

    /// Fetches one status snapshot of a task.
    pub async fn task_status(&self, uuid: &str) -> Result<Image> {
        if uuid.trim().is_empty() {
            return Err(KandinskyError::EmptyTaskId);
        }
        let url = format!("{}{}{}", self.base_url, STATUS_PATH, uuid);
        let response = self.transport.get(&url, &self.credentials).await?;
        check_status(&response)?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 {
        default
    } else {
        value
    }
}

pub(crate) fn check_status(response: &RawResponse) -> Result<()> {
    match KandinskyError::from_status(response.status) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
