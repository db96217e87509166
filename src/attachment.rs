//! Image attachments: reading, validating and encoding user-selected files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine};
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::models::Part;

/// Represents possible errors that can occur while preparing an attachment.
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// Failed to get file metadata from the filesystem.
    #[error("Failed to read file metadata for {path:?}: {source}")]
    Metadata {
        /// The file that was selected.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// Failed to read file contents.
    #[error("Failed to read file {path:?}: {source}")]
    Read {
        /// The file that was selected.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// Failed to determine MIME type for the file.
    #[error("Unknown MIME type for {0:?}")]
    UnknownMimeType(PathBuf),
    /// The file is not an image.
    #[error("Unsupported attachment type {0}: only images can be attached")]
    NotAnImage(String),
    /// The file exceeds the configured size limit.
    #[error("Attachment is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge {
        /// Size of the file in bytes.
        size: u64,
        /// The configured limit in bytes.
        limit: u64,
    },
    /// The file has no content.
    #[error("Attachment {0:?} is empty")]
    Empty(PathBuf),
    /// The payload is not valid base64.
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Which files may be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    /// Largest accepted file size in bytes.
    pub max_bytes: u64,
}

impl AttachmentPolicy {
    /// Accepts `image/*` files of at most `max_bytes`.
    pub fn images_up_to(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    fn check_mime(&self, mime_type: &str) -> Result<(), AttachmentError> {
        if mime_type.starts_with("image/") {
            Ok(())
        } else {
            Err(AttachmentError::NotAnImage(mime_type.to_string()))
        }
    }

    fn check_size(&self, size: u64) -> Result<(), AttachmentError> {
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::images_up_to(DEFAULT_MAX_ATTACHMENT_BYTES)
    }
}

/// An image ready to be sent: its MIME type and base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    mime_type: String,
    data: String,
    size: u64,
}

impl Attachment {
    /// Reads an image file fully into memory and encodes it.
    ///
    /// The MIME type is derived from the file extension.
    pub async fn from_path(
        path: impl AsRef<Path>,
        policy: &AttachmentPolicy,
    ) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let mime_type = mime_guess::from_path(path)
            .first()
            .ok_or_else(|| AttachmentError::UnknownMimeType(path.to_path_buf()))?
            .to_string();
        policy.check_mime(&mime_type)?;

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|source| AttachmentError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        policy.check_size(size)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AttachmentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(AttachmentError::Empty(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, mime_type, &bytes, policy)
    }

    /// Encodes in-memory bytes with a known MIME type.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
        policy: &AttachmentPolicy,
    ) -> Result<Self, AttachmentError> {
        let name = name.into();
        let mime_type = mime_type.into();
        policy.check_mime(&mime_type)?;
        policy.check_size(bytes.len() as u64)?;
        if bytes.is_empty() {
            return Err(AttachmentError::Empty(PathBuf::from(name)));
        }

        debug!(%name, %mime_type, size = bytes.len(), "encoded attachment");
        Ok(Self {
            name,
            mime_type,
            data: base64_engine.encode(bytes),
            size: bytes.len() as u64,
        })
    }

    /// The file name shown to the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The MIME type of the image.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The original size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The base64 payload, without any data-URL prefix.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Converts the attachment into an inline data part.
    pub fn to_part(&self) -> Part {
        Part::inline(&self.mime_type, &self.data)
    }

    /// Decodes the payload back into the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, AttachmentError> {
        Ok(base64_engine.decode(&self.data)?)
    }

    /// A `data:` URL embedding the image.
    pub fn data_url(&self) -> String {
        data_url(&self.mime_type, &self.data)
    }
}

/// Builds a `data:` URL from a MIME type and base64 payload.
pub fn data_url(mime_type: &str, data: &str) -> String {
    format!("data:{mime_type};base64,{data}")
}

/// Hands out previews and keeps count of the ones still alive.
#[derive(Debug, Clone, Default)]
pub struct PreviewTracker {
    live: Arc<AtomicUsize>,
}

impl PreviewTracker {
    /// Creates a tracker with no live previews.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a preview for `attachment`; it is released when dropped.
    pub fn preview(&self, attachment: &Attachment) -> Preview {
        self.live.fetch_add(1, Ordering::SeqCst);
        Preview {
            url: attachment.data_url(),
            label: format!(
                "{} ({}, {})",
                attachment.name(),
                attachment.mime_type(),
                human_size(attachment.size())
            ),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of previews not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A preview of a pending attachment.
#[derive(Debug)]
pub struct Preview {
    url: String,
    label: String,
    live: Arc<AtomicUsize>,
}

impl Preview {
    /// The data URL of the previewed image.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// A one-line description of the attachment.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the single attachment pending for the next message.
#[derive(Debug, Default)]
pub struct AttachmentSlot {
    tracker: PreviewTracker,
    pending: Option<(Attachment, Preview)>,
}

impl AttachmentSlot {
    /// Creates an empty slot whose previews are counted by `tracker`.
    pub fn new(tracker: PreviewTracker) -> Self {
        Self {
            tracker,
            pending: None,
        }
    }

    /// Sets the pending attachment, releasing the preview of any previous one.
    pub fn attach(&mut self, attachment: Attachment) -> &Preview {
        let preview = self.tracker.preview(&attachment);
        let (_, preview) = self.pending.insert((attachment, preview));
        preview
    }

    /// Clears the pending attachment. Returns `true` if there was one.
    pub fn remove(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Takes the pending attachment for sending and releases its preview.
    pub fn take(&mut self) -> Option<Attachment> {
        self.pending.take().map(|(attachment, _)| attachment)
    }

    /// The pending attachment, if any.
    pub fn pending(&self) -> Option<&Attachment> {
        self.pending.as_ref().map(|(attachment, _)| attachment)
    }

    /// The preview of the pending attachment, if any.
    pub fn preview(&self) -> Option<&Preview> {
        self.pending.as_ref().map(|(_, preview)| preview)
    }

    /// Returns `true` if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// The tracker counting this slot's previews.
    pub fn tracker(&self) -> &PreviewTracker {
        &self.tracker
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < KIB * KIB {
        format!("{:.1} KiB", bytes / KIB)
    } else {
        format!("{:.1} MiB", bytes / (KIB * KIB))
    }
}
