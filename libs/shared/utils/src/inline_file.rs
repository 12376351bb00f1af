use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InlineFileError {
    #[error("Attachment is not valid base64: {0}")]
    NotBase64(String),

    #[error("Attachment is empty")]
    Empty,
}

/// Base64 encoded file sent inline in a JSON body, either bare or as a data
/// URL (`data:image/png;base64,...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineFile {
    pub content_type: Option<String>,
    pub data: String,
}

impl InlineFile {
    pub fn decode(&self) -> Result<Vec<u8>, InlineFileError> {
        let payload = self
            .data
            .split_once(";base64,")
            .map_or(self.data.as_str(), |(_, payload)| payload);

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| InlineFileError::NotBase64(e.to_string()))?;
        if bytes.is_empty() {
            return Err(InlineFileError::Empty);
        }
        Ok(bytes)
    }

    /// Declared content type, else the one named in a data URL, else
    /// `fallback`.
    pub fn content_type_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.content_type
            .as_deref()
            .or_else(|| {
                self.data
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split_once(";base64,"))
                    .map(|(mime, _)| mime)
            })
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn file(data: &str) -> InlineFile {
        InlineFile { content_type: None, data: data.to_string() }
    }

    #[test]
    fn test_decodes_bare_and_data_url_payloads() {
        assert_eq!(file("aGVsbG8=").decode().unwrap(), b"hello");
        assert_eq!(file("data:image/png;base64,aGVsbG8=").decode().unwrap(), b"hello");
    }

    #[test]
    fn test_rejects_garbage_and_empty_payloads() {
        assert_matches!(file("***").decode(), Err(InlineFileError::NotBase64(_)));
        assert_matches!(file("").decode(), Err(InlineFileError::Empty));
    }

    #[test]
    fn test_content_type_resolution() {
        assert_eq!(file("data:image/png;base64,aGVsbG8=").content_type_or("image/jpeg"), "image/png");
        assert_eq!(file("aGVsbG8=").content_type_or("image/jpeg"), "image/jpeg");

        let declared = InlineFile { content_type: Some("application/pdf".into()), data: "aGVsbG8=".into() };
        assert_eq!(declared.content_type_or("image/jpeg"), "application/pdf");
    }
}
