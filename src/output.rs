//! Rendered preview output.

use crate::file::human_size;
use crate::mime::JPEG_CONTENT_TYPE;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::fmt;

/// A rendered preview: content type plus encoded payload.
///
/// Built-in routes always produce `image/jpg`; custom handlers may return
/// anything. An output with an empty content type or empty payload is
/// incomplete and is never handed to a caller by
/// [`crate::PreviewSession::stream`].
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PreviewOutput {
    content_type: String,
    #[serde(skip)]
    payload: Vec<u8>,
}

impl PreviewOutput {
    pub fn new(content_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            payload,
        }
    }

    /// Output of a built-in route.
    pub fn jpeg(payload: Vec<u8>) -> Self {
        Self::new(JPEG_CONTENT_TYPE, payload)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Both the content type and the payload are present.
    pub fn is_complete(&self) -> bool {
        !self.content_type.is_empty() && !self.payload.is_empty()
    }

    /// `data:` URI for embedding the preview inline, e.g. in an `<img>` tag.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.payload))
    }
}

impl fmt::Debug for PreviewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewOutput")
            .field("content_type", &self.content_type)
            .field("payload", &human_size(self.payload.len() as u64))
            .finish()
    }
}
