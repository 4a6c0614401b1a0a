//! Batch file loading.
//!
//! Supports both layouts:
//! - `{"items": [...]}`
//! - `[...]` (flat array)
//!
//! An item carries either a text `message` or a `media` attachment. Relative
//! media paths are resolved against the batch file's directory.
//!
//! CHANGELOG:
//! - 10/18/2026 - Media attachments
//! - 10/14/2026 - Adapted from the contacts.json loader

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::transport::MessageContent;

/// One intended recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub contact: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaAttachment>,
}

impl BatchItem {
    pub fn new(contact: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
            message: message.into(),
            media: None,
        }
    }

    /// Item that sends a file instead of text.
    pub fn media(contact: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            contact: contact.into(),
            message: String::new(),
            media: Some(MediaAttachment {
                path: path.into(),
                mime_type: None,
            }),
        }
    }
}

/// File to send as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub path: PathBuf,
    /// Guessed from the extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaAttachment {
    /// Read the file into send-ready content.
    pub async fn load(&self) -> Result<MessageContent, BatchError> {
        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            BatchError::Input(format!("failed to read media {:?}: {}", self.path, e))
        })?;
        let filename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let mime_type = self
            .mime_type
            .clone()
            .unwrap_or_else(|| mime_from_extension(&self.path).to_string());

        Ok(MessageContent::Media {
            mime_type,
            filename,
            data,
        })
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
struct BatchFile {
    items: Vec<BatchItem>,
}

/// Parse batch JSON text.
pub fn parse_items(content: &str) -> Result<Vec<BatchItem>, BatchError> {
    // Wrapped format first ({"items": [...]})
    let items = match serde_json::from_str::<BatchFile>(content) {
        Ok(wrapper) => wrapper.items,
        Err(_) => serde_json::from_str::<Vec<BatchItem>>(content)
            .map_err(|e| BatchError::Input(format!("failed to parse batch JSON: {}", e)))?,
    };

    if items.is_empty() {
        return Err(BatchError::Input("batch contains no items".to_string()));
    }

    for (pos, item) in items.iter().enumerate() {
        let has_text = !item.message.trim().is_empty();
        match (has_text, item.media.is_some()) {
            (false, false) => {
                return Err(BatchError::Input(format!(
                    "item {} ({}) has an empty message",
                    pos + 1,
                    item.contact
                )))
            }
            (true, true) => {
                return Err(BatchError::Input(format!(
                    "item {} ({}) has both a message and media",
                    pos + 1,
                    item.contact
                )))
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Load a batch file from disk.
pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Vec<BatchItem>, BatchError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        BatchError::Input(format!("failed to read {:?}: {}", path.as_ref(), e))
    })?;
    let mut items = parse_items(&content)?;

    if let Some(base) = path.as_ref().parent() {
        for media in items.iter_mut().filter_map(|item| item.media.as_mut()) {
            if media.path.is_relative() {
                media.path = base.join(&media.path);
            }
        }
    }
    Ok(items)
}
