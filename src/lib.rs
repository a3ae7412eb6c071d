pub mod client;
pub mod error;
pub mod generator;
pub mod image;
pub mod poll;
pub mod stream;
pub mod transport;
pub mod types;

pub use client::Kandinsky;
pub use error::{KandinskyError, Result};
pub use generator::{generate_image, TextToImage};
pub use image::{Image, ImageFormat};
pub use poll::{CancelToken, PollOptions};
pub use transport::{HttpTransport, Transport};
pub use types::{ApiError, GenerationParams, KandinskyOptions, Model, TaskHandle, TaskState};
