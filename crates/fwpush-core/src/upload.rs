//! Firmware upload over HTTP.
//!
//! One request per upload: a multipart POST of the firmware image to
//! `http://<address>/firmware` with HTTP Basic authentication. The device
//! answers 200 when it accepted the image; anything else is a failure that
//! is reported, not retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::credentials::Credentials;

/// Path of the device's firmware update endpoint.
pub const FIRMWARE_ENDPOINT: &str = "/firmware";

/// Multipart field the device reads the image from.
pub const FORM_FIELD: &str = "update";

/// File name sent with the multipart part.
pub const FORM_FILE_NAME: &str = "firmware.bin";

/// Content type of the multipart part.
pub const FORM_CONTENT_TYPE: &str = "application/octet-stream";

/// Bound on the whole request, including reading the response.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that abort an upload before a status code is known.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read firmware '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build upload request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upload to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
}

impl UploadError {
    /// Whether the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UploadError::Transport { source, .. } if source.is_timeout())
    }
}

/// A single firmware upload: where to, as whom, and which image.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    target: String,
    credentials: Credentials,
    firmware: PathBuf,
}

impl UploadRequest {
    /// `target` is the device address, `host` or `host:port`.
    pub fn new(
        target: impl Into<String>,
        credentials: Credentials,
        firmware: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target: target.into(),
            credentials,
            firmware: firmware.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn firmware(&self) -> &Path {
        &self.firmware
    }

    /// The firmware endpoint URL on the target.
    pub fn url(&self) -> String {
        format!("http://{}{FIRMWARE_ENDPOINT}", self.target)
    }
}

/// The device's answer to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Response body, verbatim.
    pub body: String,
}

impl UploadOutcome {
    /// Only HTTP 200 counts as an accepted image.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    /// The operator-facing result line.
    pub fn summary(&self) -> String {
        if self.is_success() {
            "✔ Upload OK".to_string()
        } else {
            format!("✖ Upload FAILED: {}", self.status)
        }
    }
}

/// HTTP client for the firmware endpoint.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
}

impl Uploader {
    /// Create an uploader bounded by [`UPLOAD_TIMEOUT`].
    pub fn new() -> Result<Self, UploadError> {
        Self::with_timeout(UPLOAD_TIMEOUT)
    }

    /// Create an uploader with a custom whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UploadError::Request)?;
        Ok(Self { client })
    }

    /// Perform exactly one upload.
    ///
    /// A non-200 answer is returned as an [`UploadOutcome`]; only failures
    /// that prevent getting an answer are errors.
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
        let image = tokio::fs::read(request.firmware())
            .await
            .map_err(|source| UploadError::Io {
                path: request.firmware().to_path_buf(),
                source,
            })?;
        let size = image.len();

        let part = Part::bytes(image)
            .file_name(FORM_FILE_NAME)
            .mime_str(FORM_CONTENT_TYPE)
            .map_err(UploadError::Request)?;
        let form = Form::new().part(FORM_FIELD, part);

        let url = request.url();
        info!(url = %url, bytes = size, "Uploading firmware");
        debug!("Using basic auth");

        let resp = self
            .client
            .post(&url)
            .basic_auth(
                request.credentials().username(),
                Some(request.credentials().expose_password()),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|source| UploadError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|source| UploadError::Transport { url, source })?;

        let outcome = UploadOutcome { status, body };
        if outcome.is_success() {
            info!(status, "Device accepted firmware");
        } else {
            warn!(status, "Device rejected firmware");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(target: &str) -> UploadRequest {
        UploadRequest::new(
            target,
            Credentials::new("admin", "secret"),
            "build/app.bin",
        )
    }

    #[test]
    fn test_url_uses_firmware_endpoint() {
        assert_eq!(request("192.0.2.5").url(), "http://192.0.2.5/firmware");
        assert_eq!(
            request("esp32.local:8080").url(),
            "http://esp32.local:8080/firmware"
        );
    }

    #[test]
    fn test_request_debug_hides_password() {
        let debug = format!("{:?}", request("192.0.2.5"));
        assert!(debug.contains("192.0.2.5"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_outcome_success() {
        let outcome = UploadOutcome {
            status: 200,
            body: "OK".to_string(),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.summary(), "✔ Upload OK");
    }

    #[test]
    fn test_outcome_failure() {
        for status in [201, 204, 401, 500] {
            let outcome = UploadOutcome {
                status,
                body: String::new(),
            };
            assert!(!outcome.is_success());
            assert_eq!(outcome.exit_code(), 1);
        }
        let outcome = UploadOutcome {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(outcome.summary(), "✖ Upload FAILED: 401");
    }

    #[tokio::test]
    async fn test_missing_firmware_is_io_error() {
        let uploader = Uploader::new().unwrap();
        let req = UploadRequest::new(
            "127.0.0.1:9",
            Credentials::new("admin", "secret"),
            "/nonexistent/firmware.bin",
        );
        let err = uploader.upload(&req).await.unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/firmware.bin"));
    }
}
