use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of an uploaded blob. Equal bytes do not make equal blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(pub Uuid);

impl BlobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A selected file. Immutable once created; clones share the id.
#[derive(Clone)]
pub struct Blob {
    id: BlobId,
    name: String,
    mime: String,
    bytes: Bytes,
}

impl Blob {
    /// The media type is stored trimmed and lowercased.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: BlobId::new(),
            name: name.into(),
            mime: mime.into().trim().to_ascii_lowercase(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> BlobId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[must_use]
pub fn to_base64(blob: &Blob) -> String {
    B64.encode(blob.bytes())
}

#[must_use]
pub fn to_data_url(blob: &Blob) -> String {
    format!("data:{};base64,{}", blob.mime(), to_base64(blob))
}

/// Turns blob content into text payloads off the caller's path.
#[async_trait]
pub trait BlobReader: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// Returns err if the content could not be read.
    async fn read_as_data_url(&self, blob: &Blob) -> anyhow::Result<String>;

    /// # Errors
    ///
    /// Returns err if the content could not be read.
    async fn read_as_base64(&self, blob: &Blob) -> anyhow::Result<String>;
}

/// Encodes on the blocking pool so large files don't stall the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Reader;

#[async_trait]
impl BlobReader for Base64Reader {
    async fn read_as_data_url(&self, blob: &Blob) -> anyhow::Result<String> {
        let blob = blob.clone();
        Ok(tokio::task::spawn_blocking(move || to_data_url(&blob)).await?)
    }

    async fn read_as_base64(&self, blob: &Blob) -> anyhow::Result<String> {
        let blob = blob.clone();
        Ok(tokio::task::spawn_blocking(move || to_base64(&blob)).await?)
    }
}
