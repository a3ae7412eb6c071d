use crate::client::Kandinsky;
use crate::error::Result;
use crate::image::Image;
use crate::poll::PollOptions;
use crate::transport::Transport;
use crate::types::{GenerationParams, KandinskyOptions, TaskHandle};
use async_trait::async_trait;

/// The resolve → submit → poll workflow of a text-to-image service.
#[async_trait]
pub trait TextToImage: Send + Sync {
    async fn resolve_model(&mut self) -> Result<u32>;

    fn is_resolved(&self) -> bool;

    async fn submit(&self, params: &GenerationParams) -> Result<TaskHandle>;

    async fn await_completion(&self, handle: &TaskHandle, options: &PollOptions) -> Result<Image>;

    /// Runs one generation end to end.
    ///
    /// The model is resolved only when it has not been resolved before.
    async fn generate(&mut self, params: &GenerationParams, options: &PollOptions) -> Result<Image> {
        if !self.is_resolved() {
            self.resolve_model().await?;
        }
        let handle = self.submit(params).await?;
        self.await_completion(&handle, options).await
    }
}

#[async_trait]
impl<T: Transport> TextToImage for Kandinsky<T> {
    async fn resolve_model(&mut self) -> Result<u32> {
        Kandinsky::resolve_model(self).await
    }

    fn is_resolved(&self) -> bool {
        self.model.is_some()
    }

    async fn submit(&self, params: &GenerationParams) -> Result<TaskHandle> {
        Kandinsky::submit(self, params).await
    }

    async fn await_completion(&self, handle: &TaskHandle, options: &PollOptions) -> Result<Image> {
        self.await_completion_with(handle, options).await
    }
}

/// Generates one image with a fresh client for the production service.
pub async fn generate_image(key: &str, secret: &str, params: &GenerationParams) -> Result<Image> {
    let mut client = Kandinsky::with_options(KandinskyOptions {
        api_key: Some(key.to_string()),
        api_secret: Some(secret.to_string()),
        ..Default::default()
    })?;
    let options = client.poll_options();
    TextToImage::generate(&mut client, params, &options).await
}
