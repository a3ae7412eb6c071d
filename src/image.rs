use crate::error::{KandinskyError, Result};
use crate::types::TaskState;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Status snapshot of a task, carrying the generated images once it is done.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub uuid: String,
    pub status: String,
    /// Base64-encoded image payloads; only the first one is used.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub censored: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

impl Image {
    pub fn state(&self) -> TaskState {
        TaskState::from_status(&self.status)
    }

    /// Rejects results flagged by the service's content policy.
    pub fn uncensored(self) -> Result<Self> {
        if self.censored {
            return Err(KandinskyError::Censored { uuid: self.uuid });
        }
        Ok(self)
    }

    /// Sets the first payload, replacing any existing one.
    pub fn add_base64(&mut self, base: &str) -> Result<()> {
        if base.is_empty() {
            return Err(KandinskyError::EmptyBase64);
        }
        if STANDARD.decode(base).is_err() {
            return Err(KandinskyError::NotBase64);
        }

        match self.images.first_mut() {
            Some(first) => *first = base.to_string(),
            None => self.images.push(base.to_string()),
        }
        Ok(())
    }

    fn payload(&self) -> Result<&str> {
        self.images
            .first()
            .map(String::as_str)
            .ok_or(KandinskyError::EmptyImage)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.payload()?)?)
    }

    /// Writes the decoded image to a temporary file, rewound to the start.
    ///
    /// The file is removed when the returned handle is dropped unless it is
    /// persisted with [`NamedTempFile::persist`].
    pub fn to_file(&self) -> Result<NamedTempFile> {
        let data = self.to_bytes()?;
        let mut file = tempfile::Builder::new()
            .prefix("kandinsky-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&data)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        log::debug!("Wrote {} bytes to {}", data.len(), file.path().display());
        Ok(file)
    }

    /// Saves the image as `<path>/<name>.<ext>`, truncating an existing file.
    ///
    /// Arguments are validated before anything is decoded or created.
    pub fn save_as(&self, name: &str, path: &str, format: ImageFormat) -> Result<PathBuf> {
        let payload = self.payload()?;
        let name = trim_name(name);
        if name.is_empty() {
            return Err(KandinskyError::EmptyFileName);
        }
        let path = path.trim().trim_matches('"');
        if path.is_empty() {
            return Err(KandinskyError::EmptyFilePath);
        }

        let data = STANDARD.decode(payload)?;
        let target = Path::new(path).join(format!("{}.{}", name, format.extension()));

        let mut file = File::create(&target)?;
        file.write_all(&data)?;
        file.sync_all()?;
        log::debug!("Saved {} bytes to {}", data.len(), target.display());
        Ok(target)
    }

    pub fn save_png(&self, name: &str, path: &str) -> Result<PathBuf> {
        self.save_as(name, path, ImageFormat::Png)
    }

    pub fn save_jpg(&self, name: &str, path: &str) -> Result<PathBuf> {
        self.save_as(name, path, ImageFormat::Jpg)
    }
}

fn trim_name(name: &str) -> &str {
    name.trim_matches(|c: char| c == '"' || c == '-' || c.is_whitespace())
}
