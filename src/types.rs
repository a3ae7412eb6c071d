use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KandinskyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Preferred model id; the first listed model is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Delay between status checks in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl KandinskyOptions {
    /// Reads credentials and the base URL from the environment, loading a
    /// `.env` file first when one exists.
    ///
    /// Recognised variables: `KAND_API_KEY`, `KAND_API_SECRET`, `KAND_API_URL`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            api_key: std::env::var("KAND_API_KEY").ok(),
            api_secret: std::env::var("KAND_API_SECRET").ok(),
            base_url: std::env::var("KAND_API_URL").ok(),
            ..Default::default()
        }
    }
}

/// A generation backend as listed by the models endpoint.
///
/// ```json
/// { "id": 4, "name": "Kandinsky", "version": 3.0, "type": "TEXT2IMAGE" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: f32,
    #[serde(rename = "type", default)]
    pub model_type: String,
}

/// Caller-facing generation parameters.
///
/// Zero dimensions are replaced with 1024 and a zero image count with 1 at
/// submission time. Non-zero dimensions are sent as given; the service
/// rejects values below 128.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationParams {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub style: Option<String>,
    pub negative_prompt: Option<String>,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateQuery<'a> {
    pub query: &'a str,
}

/// Wire shape of the `params` multipart field.
#[derive(Debug, Serialize)]
pub(crate) struct ParamsPayload<'a> {
    #[serde(rename = "type")]
    pub generation_type: &'static str,
    pub style: &'a str,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    #[serde(rename = "negativePromptUnclip", skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    #[serde(rename = "generateParams")]
    pub generate_params: GenerateQuery<'a>,
}

/// Identifier of a submitted task together with its initial status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskHandle {
    pub uuid: String,
    #[serde(default)]
    pub status: String,
}

impl TaskHandle {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            status: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Done,
    Failed,
}

impl TaskState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "DONE" => Self::Done,
            "FAIL" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Structured error body returned by the service.
///
/// ```json
/// {
///   "timestamp": "2024-03-04T13:46:55.473+00:00",
///   "status": 400,
///   "error": "Bad Request",
///   "message": "Failed to convert value of type ...",
///   "path": "/key/api/v1/text2image/run"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default)]
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub path: String,
}

impl ApiError {
    pub fn timestamp_parsed(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .or_else(|_| DateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f%:z"))
            .ok()
    }
}
